// src/controllers/dashboard_controller.rs
use actix_web::{Error, HttpResponse, Responder, error, get, web};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::models::ptk::Ptk;

const PER_PAGE: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    kecamatan: Option<String>,
    search: Option<String>,
    page: Option<u32>,
}

#[derive(Debug, Serialize, PartialEq)]
struct KategoriJumlah {
    name: String,
    jumlah: i64,
}

#[derive(Serialize)]
struct DashboardResponse {
    status_kepegawaian: Vec<KategoriJumlah>,
    pendidikan: Vec<KategoriJumlah>,
    total_ptk: i64,
    total_pns: i64,
    total_pppk: i64,
    total_s1: i64,
    data: Vec<Ptk>,
    current_page: u32,
    total_pages: u32,
    total_items: i64,
    per_page: u32,
}

// Filter yang dipakai dua arah: statistik hanya memakai kecamatan,
// tabel memakai kecamatan + kata kunci pencarian.
#[derive(Debug, Default)]
struct PtkFilter {
    kecamatan: Option<String>,
    cari: Option<String>,
}

impl PtkFilter {
    fn dari_query(q: &DashboardQuery) -> Self {
        // "semua" adalah sentinel dropdown untuk tanpa filter kecamatan
        let kecamatan = q
            .kecamatan
            .as_deref()
            .filter(|k| !k.is_empty() && *k != "semua")
            .map(str::to_string);
        let cari = q
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self { kecamatan, cari }
    }

    fn hanya_kecamatan(&self) -> Self {
        Self {
            kecamatan: self.kecamatan.clone(),
            cari: None,
        }
    }

    fn terapkan(&self, qb: &mut QueryBuilder<'_, MySql>) {
        if let Some(kec) = &self.kecamatan {
            qb.push(" AND kecamatan = ").push_bind(kec.clone());
        }
        if let Some(cari) = &self.cari {
            let pola = format!("%{}%", cari);
            qb.push(" AND (LOWER(nama) LIKE LOWER(")
                .push_bind(pola.clone())
                .push(") OR LOWER(nip) LIKE LOWER(")
                .push_bind(pola)
                .push("))");
        }
    }
}

fn kelompokkan(rows: Vec<(Option<String>, i64)>, tanpa_nilai: &str) -> Vec<KategoriJumlah> {
    let mut hasil: Vec<KategoriJumlah> = rows
        .into_iter()
        .map(|(name, jumlah)| KategoriJumlah {
            name: match name {
                Some(n) if !n.is_empty() => n,
                _ => tanpa_nilai.to_string(),
            },
            jumlah,
        })
        .collect();
    hasil.sort_by(|a, b| b.jumlah.cmp(&a.jumlah).then_with(|| a.name.cmp(&b.name)));
    hasil
}

fn jumlah_kategori(kelompok: &[KategoriJumlah], name: &str) -> i64 {
    kelompok
        .iter()
        .find(|k| k.name == name)
        .map_or(0, |k| k.jumlah)
}

// Offset dihitung di i64: page datang dari query string dan boleh sangat
// besar, perkalian u32 bisa overflow.
fn hitung_offset(page: u32, per_page: u32) -> i64 {
    (i64::from(page.max(1)) - 1) * i64::from(per_page)
}

fn hitung_total_halaman(total: i64, per_page: u32) -> u32 {
    if total == 0 {
        0
    } else {
        (total as f64 / per_page as f64).ceil() as u32
    }
}

async fn hitung_per_kolom(
    pool: &MySqlPool,
    kolom: &str,
    filter: &PtkFilter,
) -> Result<Vec<(Option<String>, i64)>, sqlx::Error> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {kolom}, COUNT(*) FROM ptk_data WHERE 1=1"
    ));
    filter.terapkan(&mut qb);
    qb.push(format!(" GROUP BY {kolom}"));
    qb.build_query_as().fetch_all(pool).await
}

#[get("/api/dashboard")]
pub async fn get_dashboard(
    pool: web::Data<MySqlPool>,
    web::Query(query): web::Query<DashboardQuery>,
) -> Result<impl Responder, Error> {
    let filter = PtkFilter::dari_query(&query);
    let page = query.page.unwrap_or(1).max(1); // halaman berbasis 1
    let offset = hitung_offset(page, PER_PAGE);

    // Statistik mengikuti filter kecamatan saja, seperti kartu metrik di UI;
    // kata kunci pencarian hanya mempersempit tabel.
    let filter_stats = filter.hanya_kecamatan();
    let status = kelompokkan(
        hitung_per_kolom(pool.get_ref(), "status_kepegawaian", &filter_stats)
            .await
            .map_err(error::ErrorInternalServerError)?,
        "Lainnya",
    );
    let pendidikan = kelompokkan(
        hitung_per_kolom(pool.get_ref(), "pendidikan", &filter_stats)
            .await
            .map_err(error::ErrorInternalServerError)?,
        "Tidak Terdefinisi",
    );

    let total_ptk: i64 = status.iter().map(|k| k.jumlah).sum();
    let total_pns = jumlah_kategori(&status, "PNS");
    let total_pppk = jumlah_kategori(&status, "PPPK");
    let total_s1 = jumlah_kategori(&pendidikan, "S1");

    let mut qb = QueryBuilder::new(
        "SELECT id, nama, nik, nuptk, nip, status_kepegawaian, pangkat_gol, jenis_ptk, \
         jabatan_ptk, pendidikan, bidang_studi_sertifikasi, tempat_tugas, npsn, kecamatan, \
         jabatan_kepsek, created_at FROM ptk_data WHERE 1=1",
    );
    filter.terapkan(&mut qb);
    qb.push(" ORDER BY id LIMIT ")
        .push_bind(i64::from(PER_PAGE))
        .push(" OFFSET ")
        .push_bind(offset);
    let data: Vec<Ptk> = qb
        .build_query_as()
        .fetch_all(pool.get_ref())
        .await
        .map_err(error::ErrorInternalServerError)?;

    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM ptk_data WHERE 1=1");
    filter.terapkan(&mut qb);
    let total: (i64,) = qb
        .build_query_as()
        .fetch_one(pool.get_ref())
        .await
        .map_err(error::ErrorInternalServerError)?;

    let response = DashboardResponse {
        status_kepegawaian: status,
        pendidikan,
        total_ptk,
        total_pns,
        total_pppk,
        total_s1,
        data,
        current_page: page,
        total_pages: hitung_total_halaman(total.0, PER_PAGE),
        total_items: total.0,
        per_page: PER_PAGE,
    };

    Ok(HttpResponse::Ok().json(response))
}

// Opsi dropdown filter kecamatan
#[get("/api/dashboard/kecamatan")]
pub async fn get_kecamatan_options(
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT kecamatan FROM ptk_data \
         WHERE kecamatan IS NOT NULL AND kecamatan <> '' ORDER BY kecamatan",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(error::ErrorInternalServerError)?;

    let opsi: Vec<String> = rows.into_iter().map(|(k,)| k).collect();
    Ok(HttpResponse::Ok().json(opsi))
}
