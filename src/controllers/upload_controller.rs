// src/controllers/upload_controller.rs
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, Responder, error, post, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use serde_json::json;
use sqlx::MySqlPool;

use crate::ingest::{self, IngestError, UploadMode};
use crate::store::MySqlPtkStore;

// Form multipart dari halaman unggah: field "file" berisi workbook .xlsx,
// field "mode" berisi "replace" atau "append". Caller diharapkan menunggu
// satu upload selesai sebelum mengirim berikutnya; dua upload bersamaan
// tidak didukung.
#[post("/api/ptk/upload")]
pub async fn upload_ptk(
    pool: web::Data<MySqlPool>,
    mut payload: Multipart,
) -> Result<impl Responder, Error> {
    let mut file_bytes = BytesMut::new();
    let mut mode_teks = String::new();

    while let Some(mut field) = payload.try_next().await.map_err(error::ErrorBadRequest)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                while let Some(chunk) = field
                    .try_next()
                    .await
                    .map_err(|e| error::ErrorBadRequest(format!("Gagal membaca file: {}", e)))?
                {
                    file_bytes.extend_from_slice(&chunk);
                }
            }
            "mode" => {
                let mut data = BytesMut::new();
                while let Some(chunk) = field.try_next().await.map_err(error::ErrorBadRequest)? {
                    data.extend_from_slice(&chunk);
                }
                mode_teks = String::from_utf8_lossy(&data).trim().to_string();
            }
            _ => {
                log::warn!("Field tidak dikenal pada form upload: {}", name);
            }
        }
    }

    if file_bytes.is_empty() {
        return Err(error::ErrorBadRequest("Silakan pilih file terlebih dahulu."));
    }

    let mode = UploadMode::parse(&mode_teks)
        .ok_or_else(|| error::ErrorBadRequest("Mode upload harus 'replace' atau 'append'"))?;

    let store = MySqlPtkStore::new(pool.get_ref().clone());
    match ingest::ingest(&store, &file_bytes, mode).await {
        Ok(jumlah) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("Berhasil! {} baris data diunggah.", jumlah),
            "inserted": jumlah,
        }))),
        Err(e @ (IngestError::Parse(_) | IngestError::Read | IngestError::EmptyBatch)) => {
            Err(error::ErrorBadRequest(e.to_string()))
        }
        Err(e) => {
            log::error!("Upload PTK gagal: {}", e);
            Err(error::ErrorInternalServerError(e.to_string()))
        }
    }
}
