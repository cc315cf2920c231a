//! Shared fixtures: a deterministic synthetic applicant dataset

#![allow(dead_code)]

use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Value};
use std::path::Path;

const EMPLEO: [&str; 4] = ["Dependiente", "Independiente", "Agricola", "Gobierno"];
const DESTINO: [&str; 3] = ["Consumo", "Comercial", "Agricola"];
const GARANTIA: [&str; 3] = ["Ninguna", "Vehiculo", "Inmueble"];

/// `n` applicants with a `moroso` flag driven mostly by credit score,
/// loan-to-collateral ratio and repayment history.
pub fn credit_dataset(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut edad = Vec::with_capacity(n);
    let mut genero = Vec::with_capacity(n);
    let mut zona = Vec::with_capacity(n);
    let mut tipo_empleo = Vec::with_capacity(n);
    let mut antiguedad = Vec::with_capacity(n);
    let mut ingresos = Vec::with_capacity(n);
    let mut score = Vec::with_capacity(n);
    let mut pagos = Vec::with_capacity(n);
    let mut creditos = Vec::with_capacity(n);
    let mut monto = Vec::with_capacity(n);
    let mut plazo = Vec::with_capacity(n);
    let mut destino = Vec::with_capacity(n);
    let mut garantia = Vec::with_capacity(n);
    let mut valor_garantia = Vec::with_capacity(n);
    let mut soya = Vec::with_capacity(n);
    let mut vino = Vec::with_capacity(n);
    let mut uso = Vec::with_capacity(n);
    let mut moroso = Vec::with_capacity(n);

    for _ in 0..n {
        let s: i64 = rng.gen_range(450..=850);
        let p: i64 = rng.gen_range(0..=6);
        let m: f64 = (rng.gen_range(5_000.0..100_000.0_f64) / 100.0).round() * 100.0;
        let g = GARANTIA[rng.gen_range(0..GARANTIA.len())];
        let vg = if g == "Ninguna" {
            (m * rng.gen_range(0.0..0.3_f64)).round()
        } else {
            (m * rng.gen_range(0.5..2.0_f64)).round()
        };

        let ratio = if vg > 0.0 { (m / vg).min(3.0) } else { 3.0 };
        let risk = 3.0 * (650.0 - s as f64) / 100.0 + 1.5 * (ratio - 1.0) - 0.5 * p as f64
            + if g == "Ninguna" { 1.0 } else { 0.0 }
            + rng.gen_range(-0.5..0.5_f64);

        edad.push(rng.gen_range(20..=70_i64));
        genero.push(if rng.gen_bool(0.5) { "M" } else { "F" });
        zona.push(if rng.gen_bool(0.6) { "Urbana" } else { "Rural" });
        tipo_empleo.push(EMPLEO[rng.gen_range(0..EMPLEO.len())]);
        antiguedad.push(rng.gen_range(0..=30_i64));
        ingresos.push((rng.gen_range(1_500.0..10_000.0_f64) * 100.0).round() / 100.0);
        score.push(s);
        pagos.push(p);
        creditos.push(rng.gen_range(0..=8_i64));
        monto.push(m);
        plazo.push([12_i64, 24, 36, 48, 60][rng.gen_range(0..5)]);
        destino.push(DESTINO[rng.gen_range(0..DESTINO.len())]);
        garantia.push(g);
        valor_garantia.push(vg);
        soya.push((rng.gen_range(350.0..450.0_f64) * 100.0).round() / 100.0);
        vino.push((rng.gen_range(40.0..60.0_f64) * 100.0).round() / 100.0);
        uso.push(rng.gen_range(0..=4_i64));
        moroso.push(i64::from(risk > 0.0));
    }

    df!(
        "edad" => edad,
        "genero" => genero,
        "zona" => zona,
        "tipo_empleo" => tipo_empleo,
        "antiguedad" => antiguedad,
        "ingresos" => ingresos,
        "score_crediticio" => score,
        "pagos_previos" => pagos,
        "creditos_previos" => creditos,
        "monto_credito" => monto,
        "plazo_meses" => plazo,
        "destino_credito" => destino,
        "tipo_garantia" => garantia,
        "valor_garantia" => valor_garantia,
        "precio_soya" => soya,
        "precio_vino" => vino,
        "uso_productos" => uso,
        "moroso" => moroso
    )
    .unwrap()
}

pub fn write_csv(df: &DataFrame, path: &Path) {
    let mut file = std::fs::File::create(path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df.clone()).unwrap();
}

/// Established client with high score and full collateral
pub fn good_applicant() -> Value {
    json!({
        "edad": 45,
        "genero": "M",
        "zona": "Urbana",
        "tipo_empleo": "Gobierno",
        "antiguedad": 20,
        "ingresos": 8000.0,
        "score_crediticio": 810,
        "pagos_previos": 5,
        "creditos_previos": 8,
        "monto_credito": 30000,
        "plazo_meses": 12,
        "destino_credito": "Consumo",
        "tipo_garantia": "Inmueble",
        "valor_garantia": 120000.0,
        "precio_soya": 430.0,
        "precio_vino": 45.0,
        "uso_productos": 4
    })
}

/// Low score, no history and almost no collateral
pub fn bad_applicant() -> Value {
    json!({
        "edad": 22,
        "genero": "F",
        "zona": "Rural",
        "tipo_empleo": "Independiente",
        "antiguedad": 1,
        "ingresos": 2000.0,
        "score_crediticio": 500,
        "pagos_previos": 0,
        "creditos_previos": 0,
        "monto_credito": 80000,
        "plazo_meses": 48,
        "destino_credito": "Comercial",
        "tipo_garantia": "Ninguna",
        "valor_garantia": 10000.0,
        "precio_soya": 380.0,
        "precio_vino": 55.0,
        "uso_productos": 0
    })
}
