// src/models/ptk.rs
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Baris tabel `ptk_data` sebagaimana tersimpan di database.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Ptk {
    pub id: i32,
    pub nama: String,
    pub nik: Option<String>,
    pub nuptk: Option<String>,
    pub nip: Option<String>,
    pub status_kepegawaian: Option<String>,
    pub pangkat_gol: Option<String>,
    pub jenis_ptk: Option<String>,
    pub jabatan_ptk: Option<String>,
    pub pendidikan: Option<String>,
    pub bidang_studi_sertifikasi: Option<String>,
    pub tempat_tugas: Option<String>,
    pub npsn: Option<String>,
    pub kecamatan: Option<String>,
    pub jabatan_kepsek: bool,
    pub created_at: DateTime<chrono::Local>,
}

/// Baris baru hasil pembacaan file Excel, belum punya id.
/// Invariant: `nama` selalu terisi dan tidak kosong setelah trim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtkBaru {
    pub nama: String,
    pub nik: Option<String>,
    pub nuptk: Option<String>,
    pub nip: Option<String>,
    pub status_kepegawaian: Option<String>,
    pub pangkat_gol: Option<String>,
    pub jenis_ptk: Option<String>,
    pub jabatan_ptk: Option<String>,
    pub pendidikan: Option<String>,
    pub bidang_studi_sertifikasi: Option<String>,
    pub tempat_tugas: Option<String>,
    pub npsn: Option<String>,
    pub kecamatan: Option<String>,
    pub jabatan_kepsek: bool,
}
