pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;

pub use repositories::PgUploadRecordRepository;
pub use routes::routes;
pub use services::UploadService;
pub use state::UploadState;
