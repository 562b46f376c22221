#![allow(dead_code)]

use rand::Rng;
use rand::seq::SliceRandom;
use std::fs::File;
use std::io::Error;
use std::path::Path;

const CURRENCIES: [&str; 5] = ["USD", "EUR", "GBP", "JPY", "XTS"];

pub fn write_csv(path: &Path, rows: &[[&str; 3]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["reference", "amount", "currency"])?;
    for row in rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes `rows` random submissions spread over `references` distinct
/// references, so most references are submitted more than once.
pub fn generate_csv(path: &Path, rows: usize, references: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["reference", "amount", "currency"])?;

    let mut rng = rand::thread_rng();
    for _ in 0..rows {
        let reference = format!("ref-{}", rng.gen_range(0..references));
        let cents: u64 = rng.gen_range(1..10_000_000);
        let amount = format!("{}.{:02}", cents / 100, cents % 100);
        let currency = CURRENCIES.choose(&mut rng).copied().unwrap_or("USD");
        wtr.write_record([reference.as_str(), amount.as_str(), currency])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Parses the binary's CSV output into rows keyed by header name.
pub fn parse_output(stdout: &[u8]) -> Vec<csv::StringRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(stdout);
    reader
        .records()
        .map(|record| record.expect("Failed to read output record"))
        .collect()
}

pub const REFERENCE: usize = 0;
pub const OUTCOME: usize = 1;
pub const ID: usize = 2;
pub const AMOUNT: usize = 3;
pub const CURRENCY: usize = 4;
pub const STATUS: usize = 5;
pub const FAILURE_REASON: usize = 6;
pub const CREATED_AT: usize = 7;
pub const UPDATED_AT: usize = 8;
