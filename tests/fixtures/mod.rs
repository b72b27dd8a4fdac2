//! Shared setup for integration tests: a database seeded with a service, one
//! employee per staff role and two applicants.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tempfile::TempDir;

use controlled_permits::api::AppState;
use controlled_permits::auth::{hash_password, TokenIssuer};
use controlled_permits::config::DatabaseConfig;
use controlled_permits::database::DatabaseManager;
use controlled_permits::domain::{
    Actor, FieldStatus, ProcedureType, Request, RequestState, Role, Service,
};
use controlled_permits::store::{
    self,
    applicants::NewApplicant,
    employees::NewEmployee,
    services::NewService,
};
use controlled_permits::storage::LocalFileStore;
use controlled_permits::workflow::{FieldReviewInput, NewRequestInput};

pub const PASSWORD: &str = "clave-segura-1";
pub const JWT_SECRET: &str = "integration-test-secret";
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024;

pub struct Staff {
    pub ventanilla: Actor,
    pub tecnico: Actor,
    pub encargado: Actor,
    pub direccion: Actor,
    pub dncd: Actor,
    pub admin: Actor,
}

pub struct TestEnv {
    pub db: DatabaseManager,
    pub state: Arc<AppState>,
    pub service: Service,
    pub staff: Staff,
    pub applicant: Actor,
    pub other_applicant: Actor,
    _uploads: TempDir,
    _db_dir: Option<TempDir>,
}

impl TestEnv {
    pub async fn new() -> Self {
        let db = DatabaseManager::in_memory().await.expect("in-memory database");
        Self::seeded(db, None).await
    }

    /// A database file with a multi-connection pool, for tests where writers
    /// actually contend.
    pub async fn file_backed() -> Self {
        let dir = tempfile::tempdir().expect("database dir");
        let url = format!("sqlite://{}", dir.path().join("permits.db").display());
        let db = DatabaseManager::new(&DatabaseConfig {
            url,
            max_connections: 5,
            ..DatabaseConfig::default()
        })
        .await
        .expect("file database");
        Self::seeded(db, Some(dir)).await
    }

    async fn seeded(db: DatabaseManager, db_dir: Option<TempDir>) -> Self {
        let uploads = tempfile::tempdir().expect("upload dir");
        let file_store = LocalFileStore::new(uploads.path()).await.expect("file store");

        let mut conn = db.pool().acquire().await.expect("connection");
        let now = Utc::now();
        let password_hash = hash_password(PASSWORD).expect("hash password");

        let service = store::services::insert(
            &mut conn,
            NewService {
                code: "CLASE-A",
                name: "Certificado de Inscripción de Drogas Controladas Clase A",
                description: Some("Farmacias y establecimientos de salud"),
                price: Decimal::new(150000, 2),
            },
        )
        .await
        .expect("seed service");

        let mut staff_ids = Vec::new();
        for (full_name, email, role) in [
            ("Vera Ventanilla", "ventanilla@salud.gob.do", Role::Ventanilla),
            ("Tomás Técnico", "tecnico@salud.gob.do", Role::TecnicoUpc),
            ("Elena Encargada", "encargado@salud.gob.do", Role::EncargadoUpc),
            ("Diego Dirección", "direccion@salud.gob.do", Role::Direccion),
            ("Dana DNCD", "dncd@dncd.gob.do", Role::Dncd),
            ("Ana Admin", "admin@salud.gob.do", Role::Admin),
        ] {
            let id = store::employees::insert(
                &mut conn,
                NewEmployee {
                    full_name,
                    email,
                    password_hash: &password_hash,
                    role,
                    now,
                },
            )
            .await
            .expect("seed employee");
            staff_ids.push(Actor::new(id, role));
        }

        let mut applicants = Vec::new();
        for (full_name, email, document_id) in [
            ("Farmacia Los Prados", "prados@example.com", "130123456"),
            ("Clínica del Este", "este@example.com", "001-1234567-8"),
        ] {
            let applicant = store::applicants::insert(
                &mut conn,
                NewApplicant {
                    full_name,
                    email,
                    document_id,
                    phone: None,
                    password_hash: &password_hash,
                    now,
                },
            )
            .await
            .expect("seed applicant");
            applicants.push(Actor::new(applicant.id, Role::Solicitante));
        }
        drop(conn);

        let state = Arc::new(AppState::new(
            db.pool().clone(),
            Arc::new(file_store),
            TokenIssuer::new(JWT_SECRET, 60),
            MAX_UPLOAD_BYTES,
        ));

        Self {
            db,
            state,
            service,
            staff: Staff {
                ventanilla: staff_ids[0],
                tecnico: staff_ids[1],
                encargado: staff_ids[2],
                direccion: staff_ids[3],
                dncd: staff_ids[4],
                admin: staff_ids[5],
            },
            applicant: applicants[0],
            other_applicant: applicants[1],
            _uploads: uploads,
            _db_dir: db_dir,
        }
    }

    pub fn token(&self, actor: Actor) -> String {
        self.state
            .tokens
            .issue(actor.id, actor.role, "test user")
            .expect("token")
    }

    pub fn sample_answers() -> serde_json::Value {
        json!({
            "razon_social": "Farmacia Los Prados SRL",
            "rnc": "130123456",
            "director_tecnico": "Lic. Carmen Peña",
        })
    }

    pub async fn create_request(&self) -> Request {
        self.state
            .wizard
            .create(
                self.applicant,
                NewRequestInput {
                    service_id: self.service.id,
                    procedure_type: ProcedureType::Nueva,
                    answers: Self::sample_answers(),
                    prior_permit: None,
                },
            )
            .await
            .expect("create request")
    }

    /// Marks every field of the actor's checklist with `status`.
    pub async fn review_all(&self, request_id: i64, actor: Actor, status: FieldStatus) {
        let stage = actor.role.review_stage().expect("reviewer role");
        let rows = self
            .state
            .reviews
            .field_reviews(request_id, Some(stage), actor)
            .await
            .expect("checklist");
        let inputs = rows
            .into_iter()
            .map(|r| FieldReviewInput {
                field_key: r.field_key,
                status,
                comment: (status == FieldStatus::Observado).then(|| "Revisar dato".to_string()),
            })
            .collect();
        self.state
            .reviews
            .record_field_reviews(request_id, inputs, actor)
            .await
            .expect("record reviews");
    }

    /// Drives a fresh request through Ventanilla to `VALIDADA`.
    pub async fn validated_request(&self) -> Request {
        let request = self.create_request().await;
        let engine = &self.state.engine;
        engine
            .open(request.id, self.staff.ventanilla)
            .await
            .expect("ventanilla opens");
        self.review_all(request.id, self.staff.ventanilla, FieldStatus::Cumple)
            .await;
        engine
            .transition(request.id, RequestState::Validada, self.staff.ventanilla, "")
            .await
            .expect("validate")
            .request
    }

    /// Continues through UPC until the request waits on Dirección.
    pub async fn request_at_direccion(&self) -> Request {
        let request = self.validated_request().await;
        let engine = &self.state.engine;
        engine
            .open(request.id, self.staff.tecnico)
            .await
            .expect("technician opens");
        self.review_all(request.id, self.staff.tecnico, FieldStatus::Cumple)
            .await;
        engine
            .transition(request.id, RequestState::EnRevisionUpc, self.staff.tecnico, "")
            .await
            .expect("technical review done");
        engine
            .open(request.id, self.staff.encargado)
            .await
            .expect("manager opens");
        engine
            .transition(request.id, RequestState::EnDireccion, self.staff.encargado, "")
            .await
            .expect("manager approves")
            .request
    }
}
