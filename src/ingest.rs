// src/ingest.rs
//
// Pembacaan file Excel data PTK: sheet pertama dipetakan ke skema ptk_data
// lewat nama kolom di baris header, lalu batch-nya ditulis ke store.
use std::collections::HashMap;
use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};
use thiserror::Error;

use crate::models::ptk::PtkBaru;
use crate::store::{PtkStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("File bukan workbook Excel yang valid: {0}")]
    Parse(String),
    #[error("Gagal membaca file.")]
    Read,
    #[error("Tidak ada data valid yang ditemukan di dalam file.")]
    EmptyBatch,
    #[error("Gagal menyimpan data: {0}")]
    Write(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Hapus semua data lama, lalu masukkan batch baru.
    Replace,
    /// Tambahkan batch baru di samping data yang sudah ada.
    Append,
}

impl UploadMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "replace" => Some(Self::Replace),
            "append" => Some(Self::Append),
            _ => None,
        }
    }
}

/// Baca workbook dan petakan isinya ke batch `PtkBaru`.
///
/// Baris yang kolom "Nama"-nya kosong (setelah trim) dibuang; itu satu-satunya
/// validasi. Kolom yang headernya tidak ada di sheet menghasilkan `None` untuk
/// seluruh baris. Batch kosong dianggap error, bukan upload sukses tanpa isi.
pub fn parse_workbook(bytes: &[u8]) -> Result<Vec<PtkBaru>, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::Read);
    }

    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| IngestError::Parse(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Parse("workbook tidak memiliki sheet".to_string()))?
        .map_err(|e| IngestError::Parse(e.to_string()))?;

    let mut baris = range.rows();
    let kolom = match baris.next() {
        Some(header) => index_header(header),
        None => return Err(IngestError::EmptyBatch),
    };

    let mut batch = Vec::new();
    for row in baris {
        let ambil = |label: &str| -> Option<String> {
            kolom.get(label).and_then(|&i| sel_ke_teks(row.get(i)))
        };

        let nama = match ambil("Nama") {
            Some(n) if !n.trim().is_empty() => n,
            _ => continue,
        };

        batch.push(PtkBaru {
            nama,
            nik: ambil("NIK"),
            nuptk: ambil("NUPTK"),
            nip: ambil("NIP"),
            status_kepegawaian: ambil("Status Kepegawaian"),
            pangkat_gol: ambil("Pangkat/Gol"),
            jenis_ptk: ambil("Jenis PTK"),
            jabatan_ptk: ambil("Jabatan PTK"),
            pendidikan: ambil("Pendidikan"),
            bidang_studi_sertifikasi: ambil("Bidang Studi Sertifikasi"),
            tempat_tugas: ambil("Tempat Tugas"),
            npsn: ambil("NPSN"),
            kecamatan: ambil("Kecamatan"),
            // Hanya literal "Ya" yang dihitung kepsek; "ya"/"YA"/kosong bukan.
            jabatan_kepsek: ambil("Jabatan Kepsek").as_deref() == Some("Ya"),
        });
    }

    if batch.is_empty() {
        return Err(IngestError::EmptyBatch);
    }
    Ok(batch)
}

/// Parse lalu tulis ke store sesuai mode. Mengembalikan jumlah baris tersimpan.
pub async fn ingest(
    store: &dyn PtkStore,
    bytes: &[u8],
    mode: UploadMode,
) -> Result<u64, IngestError> {
    let batch = parse_workbook(bytes)?;
    log::info!("Mengirim {} baris data PTK (mode {:?})", batch.len(), mode);
    let tersimpan = match mode {
        UploadMode::Replace => store.replace_all(&batch).await?,
        UploadMode::Append => store.insert_batch(&batch).await?,
    };
    Ok(tersimpan)
}

// Peta label header -> indeks kolom, dibangun sekali per upload.
// Header duplikat: kolom pertama yang menang.
fn index_header(header: &[DataType]) -> HashMap<String, usize> {
    let mut peta = HashMap::new();
    for (i, sel) in header.iter().enumerate() {
        if let Some(label) = sel_ke_teks(Some(sel)) {
            peta.entry(label).or_insert(i);
        }
    }
    peta
}

// Sel kosong atau bernilai "falsy" di sumber (string kosong, angka nol,
// boolean false) dianggap tidak terisi. Angka dan tanggal lain dilewatkan
// apa adanya sebagai teks, tanpa normalisasi.
fn sel_ke_teks(sel: Option<&DataType>) -> Option<String> {
    match sel {
        Some(DataType::String(v)) if v.is_empty() => None,
        Some(DataType::String(v)) => Some(v.clone()),
        Some(DataType::Float(v)) if *v == 0.0 => None,
        Some(DataType::Float(v)) => Some(v.to_string()),
        Some(DataType::Int(0)) => None,
        Some(DataType::Int(v)) => Some(v.to_string()),
        Some(DataType::Bool(false)) => None,
        Some(DataType::Bool(v)) => Some(v.to_string()),
        Some(DataType::Empty) | None => None,
        Some(lain) => Some(lain.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rust_xlsxwriter::Workbook;

    use super::*;

    fn buku(header: &[&str], data: &[&[&str]]) -> Vec<u8> {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet();
        for (c, label) in header.iter().enumerate() {
            sheet.write_string(0, c as u16, *label).unwrap();
        }
        for (r, row) in data.iter().enumerate() {
            for (c, val) in row.iter().enumerate() {
                sheet.write_string((r + 1) as u32, c as u16, *val).unwrap();
            }
        }
        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn baris_tanpa_nama_dibuang() {
        let bytes = buku(
            &["Nama", "NIP", "Kecamatan"],
            &[&["Budi", "111", "A"], &["", "222", "B"], &["   ", "333", "C"]],
        );
        let batch = parse_workbook(&bytes).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].nama, "Budi");
        assert_eq!(batch[0].nip.as_deref(), Some("111"));
        assert_eq!(batch[0].kecamatan.as_deref(), Some("A"));
        assert_eq!(batch[0].nik, None);
        assert!(!batch[0].jabatan_kepsek);
    }

    #[test]
    fn jabatan_kepsek_hanya_literal_ya() {
        let bytes = buku(
            &["Nama", "Jabatan Kepsek"],
            &[
                &["Budi", "Ya"],
                &["Siti", "ya"],
                &["Andi", "YA"],
                &["Rina", ""],
                &["Dewi", "Tidak"],
            ],
        );
        let batch = parse_workbook(&bytes).unwrap();
        let kepsek: Vec<bool> = batch.iter().map(|p| p.jabatan_kepsek).collect();
        assert_eq!(kepsek, vec![true, false, false, false, false]);
    }

    #[test]
    fn header_absen_membuat_field_null() {
        // Kolom kedua berisi data tapi tidak berlabel NIK, jadi tidak terpetakan.
        let bytes = buku(&["Nama", "Kolom Lain"], &[&["Budi", "1234567890"]]);
        let batch = parse_workbook(&bytes).unwrap();
        assert_eq!(batch[0].nik, None);
        assert_eq!(batch[0].nuptk, None);
        assert_eq!(batch[0].pendidikan, None);
    }

    #[test]
    fn urutan_kolom_tidak_berpengaruh() {
        let bytes = buku(
            &["Kecamatan", "NIP", "Nama"],
            &[&["Sukajadi", "198001012005011001", "Budi"]],
        );
        let batch = parse_workbook(&bytes).unwrap();
        assert_eq!(batch[0].nama, "Budi");
        assert_eq!(batch[0].nip.as_deref(), Some("198001012005011001"));
        assert_eq!(batch[0].kecamatan.as_deref(), Some("Sukajadi"));
    }

    #[test]
    fn header_duplikat_kolom_pertama_menang() {
        let bytes = buku(&["Nama", "Nama"], &[&["Budi", "Siti"]]);
        let batch = parse_workbook(&bytes).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].nama, "Budi");
    }

    #[test]
    fn sel_angka_dilewatkan_sebagai_teks() {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet();
        sheet.write_string(0, 0, "Nama").unwrap();
        sheet.write_string(0, 1, "NIP").unwrap();
        sheet.write_string(1, 0, "Budi").unwrap();
        sheet.write_number(1, 1, 111.0).unwrap();
        let batch = parse_workbook(&wb.save_to_buffer().unwrap()).unwrap();
        assert_eq!(batch[0].nip.as_deref(), Some("111"));
    }

    #[test]
    fn sel_angka_nol_dianggap_kosong() {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet();
        sheet.write_string(0, 0, "Nama").unwrap();
        sheet.write_string(0, 1, "NPSN").unwrap();
        sheet.write_string(1, 0, "Budi").unwrap();
        sheet.write_number(1, 1, 0.0).unwrap();
        let batch = parse_workbook(&wb.save_to_buffer().unwrap()).unwrap();
        assert_eq!(batch[0].npsn, None);
    }

    #[test]
    fn hanya_header_berarti_batch_kosong() {
        let bytes = buku(&["Nama", "NIP"], &[]);
        assert!(matches!(
            parse_workbook(&bytes),
            Err(IngestError::EmptyBatch)
        ));
    }

    #[test]
    fn semua_nama_kosong_berarti_batch_kosong() {
        let bytes = buku(&["Nama", "NIP"], &[&["", "111"]]);
        assert!(matches!(
            parse_workbook(&bytes),
            Err(IngestError::EmptyBatch)
        ));
    }

    #[test]
    fn bytes_bukan_workbook_adalah_parse_error() {
        let hasil = parse_workbook(b"ini jelas bukan xlsx");
        assert!(matches!(hasil, Err(IngestError::Parse(_))));
    }

    #[test]
    fn bytes_kosong_adalah_read_error() {
        assert!(matches!(parse_workbook(&[]), Err(IngestError::Read)));
    }

    #[test]
    fn mode_upload_dari_teks() {
        assert_eq!(UploadMode::parse("replace"), Some(UploadMode::Replace));
        assert_eq!(UploadMode::parse("append"), Some(UploadMode::Append));
        assert_eq!(UploadMode::parse("Replace"), None);
        assert_eq!(UploadMode::parse(""), None);
    }

    // Store bohongan untuk menguji urutan hapus/insert tanpa database.
    #[derive(Default)]
    struct TokoPalsu {
        rows: Mutex<Vec<PtkBaru>>,
        gagal_hapus: bool,
        gagal_insert: bool,
        hapus_dipanggil: Mutex<bool>,
    }

    impl TokoPalsu {
        fn berisi(names: &[&str]) -> Self {
            let toko = Self::default();
            toko.rows.lock().unwrap().extend(names.iter().map(|n| PtkBaru {
                nama: n.to_string(),
                nik: None,
                nuptk: None,
                nip: None,
                status_kepegawaian: None,
                pangkat_gol: None,
                jenis_ptk: None,
                jabatan_ptk: None,
                pendidikan: None,
                bidang_studi_sertifikasi: None,
                tempat_tugas: None,
                npsn: None,
                kecamatan: None,
                jabatan_kepsek: false,
            }));
            toko
        }
    }

    #[async_trait]
    impl PtkStore for TokoPalsu {
        async fn delete_all(&self) -> Result<(), StoreError> {
            *self.hapus_dipanggil.lock().unwrap() = true;
            if self.gagal_hapus {
                return Err(StoreError::Database("delete ditolak".to_string()));
            }
            self.rows.lock().unwrap().clear();
            Ok(())
        }

        async fn insert_batch(&self, batch: &[PtkBaru]) -> Result<u64, StoreError> {
            if self.gagal_insert {
                return Err(StoreError::Database("insert ditolak".to_string()));
            }
            self.rows.lock().unwrap().extend(batch.iter().cloned());
            Ok(batch.len() as u64)
        }
    }

    #[actix_web::test]
    async fn mode_replace_mengganti_seluruh_isi() {
        let toko = TokoPalsu::berisi(&["Lama1", "Lama2"]);
        let bytes = buku(&["Nama"], &[&["Budi"]]);
        let jumlah = ingest(&toko, &bytes, UploadMode::Replace).await.unwrap();
        assert_eq!(jumlah, 1);
        let rows = toko.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nama, "Budi");
    }

    #[actix_web::test]
    async fn mode_append_menambah_tanpa_menghapus() {
        let toko = TokoPalsu::berisi(&["Lama"]);
        let bytes = buku(&["Nama"], &[&["Budi"]]);
        let jumlah = ingest(&toko, &bytes, UploadMode::Append).await.unwrap();
        assert_eq!(jumlah, 1);
        assert!(!*toko.hapus_dipanggil.lock().unwrap());
        assert_eq!(toko.rows.lock().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn replace_dengan_delete_gagal_tidak_pernah_insert() {
        let toko = TokoPalsu {
            gagal_hapus: true,
            ..TokoPalsu::berisi(&["Lama"])
        };
        let bytes = buku(&["Nama"], &[&["Budi"]]);
        let hasil = ingest(&toko, &bytes, UploadMode::Replace).await;
        assert!(matches!(hasil, Err(IngestError::Write(_))));
        // Data lama tetap utuh, batch baru tidak pernah masuk.
        let rows = toko.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nama, "Lama");
    }

    #[actix_web::test]
    async fn append_dengan_insert_gagal_tidak_menyentuh_data_lama() {
        let toko = TokoPalsu {
            gagal_insert: true,
            ..TokoPalsu::berisi(&["Lama"])
        };
        let bytes = buku(&["Nama"], &[&["Budi"]]);
        let hasil = ingest(&toko, &bytes, UploadMode::Append).await;
        assert!(matches!(hasil, Err(IngestError::Write(_))));
        assert!(!*toko.hapus_dipanggil.lock().unwrap());
        assert_eq!(toko.rows.lock().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn batch_kosong_tidak_menulis_apa_pun() {
        let toko = TokoPalsu::berisi(&["Lama"]);
        let bytes = buku(&["Nama"], &[&[""]]);
        let hasil = ingest(&toko, &bytes, UploadMode::Replace).await;
        assert!(matches!(hasil, Err(IngestError::EmptyBatch)));
        assert!(!*toko.hapus_dipanggil.lock().unwrap());
        assert_eq!(toko.rows.lock().unwrap().len(), 1);
    }
}
