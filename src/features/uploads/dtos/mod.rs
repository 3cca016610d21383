mod upload_dto;

pub use upload_dto::{
    is_image_content_type, sanitize_file_name, ImageUpload, UploadedFile, AUTH_FIELD, FILE_FIELD,
    UPLOAD_SUCCESS_MESSAGE,
};
