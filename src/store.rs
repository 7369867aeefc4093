// src/store.rs
use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use thiserror::Error;

use crate::models::ptk::PtkBaru;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Akses tabel `ptk_data`. Handler tidak memakai pool secara langsung
/// supaya alur ingest bisa diuji dengan store bohongan di memori.
#[async_trait]
pub trait PtkStore: Send + Sync {
    async fn delete_all(&self) -> Result<(), StoreError>;

    async fn insert_batch(&self, batch: &[PtkBaru]) -> Result<u64, StoreError>;

    /// Mode ganti data: hapus semua baris lama lalu tulis batch baru.
    /// Hapus yang gagal berarti insert tidak boleh dijalankan.
    async fn replace_all(&self, batch: &[PtkBaru]) -> Result<u64, StoreError> {
        self.delete_all().await?;
        self.insert_batch(batch).await
    }
}

pub struct MySqlPtkStore {
    pool: MySqlPool,
}

impl MySqlPtkStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn insert_builder(batch: &[PtkBaru]) -> QueryBuilder<'_, MySql> {
    let mut qb = QueryBuilder::new(
        "INSERT INTO ptk_data (nama, nik, nuptk, nip, status_kepegawaian, pangkat_gol, \
         jenis_ptk, jabatan_ptk, pendidikan, bidang_studi_sertifikasi, tempat_tugas, \
         npsn, kecamatan, jabatan_kepsek) ",
    );
    qb.push_values(batch, |mut b, ptk| {
        b.push_bind(&ptk.nama)
            .push_bind(&ptk.nik)
            .push_bind(&ptk.nuptk)
            .push_bind(&ptk.nip)
            .push_bind(&ptk.status_kepegawaian)
            .push_bind(&ptk.pangkat_gol)
            .push_bind(&ptk.jenis_ptk)
            .push_bind(&ptk.jabatan_ptk)
            .push_bind(&ptk.pendidikan)
            .push_bind(&ptk.bidang_studi_sertifikasi)
            .push_bind(&ptk.tempat_tugas)
            .push_bind(&ptk.npsn)
            .push_bind(&ptk.kecamatan)
            .push_bind(ptk.jabatan_kepsek);
    });
    qb
}

#[async_trait]
impl PtkStore for MySqlPtkStore {
    async fn delete_all(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM ptk_data")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_batch(&self, batch: &[PtkBaru]) -> Result<u64, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let mut qb = insert_builder(batch);
        let hasil = qb.build().execute(&self.pool).await?;
        Ok(hasil.rows_affected())
    }

    // DELETE + INSERT dalam satu transaksi; mode ganti tidak boleh
    // meninggalkan tabel kosong kalau insert-nya gagal.
    async fn replace_all(&self, batch: &[PtkBaru]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM ptk_data")
            .execute(&mut *tx)
            .await?;
        let mut qb = insert_builder(batch);
        let hasil = qb.build().execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(hasil.rows_affected())
    }
}
