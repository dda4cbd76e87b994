use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// Write a deterministic synthetic listings dataset as CSV and Parquet.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of rows to generate
    #[arg(long, default_value_t = 5000)]
    rows: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output path without extension; `.csv` and `.parquet` are appended
    #[arg(long, default_value = "sample_listings")]
    out: PathBuf,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }
}

/// Region name, centre (lat, lon), spread, log-price mean, share of rows.
const REGIONS: [(&str, f64, f64, f64, f64, f64); 5] = [
    ("Manhattan", 40.7831, -73.9712, 0.025, 5.1, 0.44),
    ("Brooklyn", 40.6782, -73.9442, 0.030, 4.6, 0.41),
    ("Queens", 40.7282, -73.7949, 0.040, 4.3, 0.11),
    ("Bronx", 40.8448, -73.8648, 0.025, 4.2, 0.03),
    ("Staten Island", 40.5795, -74.1502, 0.030, 4.4, 0.01),
];

const ROOM_TYPES: [&str; 3] = ["Entire home/apt", "Private room", "Shared room"];

#[derive(Debug, Serialize)]
struct Row {
    id: i64,
    neighbourhood_group: &'static str,
    latitude: f64,
    longitude: f64,
    room_type: &'static str,
    price: i64,
    availability_365: i64,
}

fn pick_region(rng: &mut SimpleRng) -> &'static (&'static str, f64, f64, f64, f64, f64) {
    let mut roll = rng.next_f64();
    for region in &REGIONS {
        if roll < region.5 {
            return region;
        }
        roll -= region.5;
    }
    &REGIONS[0]
}

fn generate(rows: usize, seed: u64) -> Vec<Row> {
    let mut rng = SimpleRng::new(seed);
    (0..rows)
        .map(|i| {
            let (name, lat, lon, spread, log_price, _) = *pick_region(&mut rng);
            // About one row in a hundred carries a zero price, like the real export.
            let price = if rng.below(100) == 0 {
                0
            } else {
                rng.gauss(log_price, 0.6).exp().round().max(10.0) as i64
            };
            Row {
                id: 1000 + i as i64,
                neighbourhood_group: name,
                latitude: rng.gauss(lat, spread),
                longitude: rng.gauss(lon, spread),
                room_type: ROOM_TYPES[rng.below(ROOM_TYPES.len() as u64) as usize],
                price,
                availability_365: rng.below(366) as i64,
            }
        })
        .collect()
}

fn write_csv(rows: &[Row], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).context("creating CSV")?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("neighbourhood_group", DataType::Utf8, false),
        Field::new("latitude", DataType::Float64, false),
        Field::new("longitude", DataType::Float64, false),
        Field::new("room_type", DataType::Utf8, false),
        Field::new("price", DataType::Int64, false),
        Field::new("availability_365", DataType::Int64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.id))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.neighbourhood_group))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.latitude))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.longitude))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.room_type))),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.price))),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.availability_365))),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating Parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let rows = generate(args.rows, args.seed);
    let csv_path = args.out.with_extension("csv");
    let parquet_path = args.out.with_extension("parquet");

    write_csv(&rows, &csv_path)?;
    write_parquet(&rows, &parquet_path)?;

    println!(
        "Wrote {} listings to {} and {}",
        rows.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
