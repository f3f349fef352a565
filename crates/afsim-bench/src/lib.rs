//! Benchmark inputs for the AFSIM driver.
//!
//! Deterministic generators for large result files and scenarios:
//!
//! - [`write_aer`]: `n` ENTITY_STATE/DETECTION records in the binary format
//! - [`write_state_csv`]: `n` platform-state rows
//! - [`write_event_log`]: `n` event lines mixing known and unknown types
//! - [`large_scenario`]: a scenario with `n` fully equipped platforms

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use afsim_core::{Field, FieldValue, Scenario};
use afsim_results::codec::record_type;
use afsim_results::AerWriter;

/// Platforms the generated files cycle through.
pub const PLATFORMS: usize = 16;

/// Cheap deterministic mixer, stable across runs.
fn mix(seed: u64, i: u64) -> u64 {
    seed.wrapping_mul(6364136223846793005)
        .wrapping_add(i.wrapping_mul(1442695040888963407))
        .rotate_left(17)
}

fn unit(seed: u64, i: u64) -> f64 {
    (mix(seed, i) >> 11) as f64 / (1u64 << 53) as f64
}

/// Write `n` AER records. Every fourth record is a DETECTION.
pub fn write_aer(path: &Path, n: usize, seed: u64) -> io::Result<()> {
    let mut writer = AerWriter::new(BufWriter::new(File::create(path)?))?;
    for i in 0..n {
        let k = i as u64;
        let platform = format!("blue_{}", i % PLATFORMS);
        let (rtype, fields) = if i % 4 == 3 {
            (
                record_type::DETECTION,
                vec![
                    text("sensor", &platform),
                    text("target", &format!("red_{}", i % PLATFORMS)),
                    number("range_m", 1000.0 + 50_000.0 * unit(seed, k)),
                ],
            )
        } else {
            (
                record_type::ENTITY_STATE,
                vec![
                    text("platform", &platform),
                    number("lat", 38.0 + unit(seed, k)),
                    number("lon", -77.0 + unit(seed ^ 1, k)),
                    number("alt", 9000.0 + 1000.0 * unit(seed ^ 2, k)),
                ],
            )
        };
        writer.write_record(rtype, i as f64 * 0.5, &fields)?;
    }
    writer.finish()?.flush()
}

/// Write `n` CSV rows: time, platform, lat, lon, alt, speed.
pub fn write_state_csv(path: &Path, n: usize, seed: u64) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "time,platform,lat,lon,alt,speed")?;
    for i in 0..n {
        let k = i as u64;
        writeln!(
            out,
            "{:.1},blue_{},{:.5},{:.5},{:.1},{:.1}",
            i as f64 * 0.5,
            i % PLATFORMS,
            38.0 + unit(seed, k),
            -77.0 + unit(seed ^ 1, k),
            9000.0 + 1000.0 * unit(seed ^ 2, k),
            200.0 + 100.0 * unit(seed ^ 3, k),
        )?;
    }
    out.flush()
}

/// Write `n` event lines. One in eight uses an event type with no known
/// schema.
pub fn write_event_log(path: &Path, n: usize, seed: u64) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# generated event log")?;
    for i in 0..n {
        let t = i as f64 * 0.5;
        let p = i % PLATFORMS;
        match i % 8 {
            7 => writeln!(out, "{t:.1} CUSTOM_EVENT blue_{p} opaque payload {i}")?,
            3 => writeln!(
                out,
                "{t:.1} MOVER_UPDATED blue_{p} {:.5} {:.5} {:.1} speed={:.1}",
                38.0 + unit(seed, i as u64),
                -77.0 + unit(seed ^ 1, i as u64),
                9000.0 + 1000.0 * unit(seed ^ 2, i as u64),
                200.0 + 100.0 * unit(seed ^ 3, i as u64),
            )?,
            _ => writeln!(out, "{t:.1} PLATFORM_ADDED blue_{p} WSF_PLATFORM blue")?,
        }
    }
    out.flush()
}

/// A scenario with `n` platforms, each with a mover, sensor and weapon.
pub fn large_scenario(n: usize) -> Scenario {
    let mut scenario = afsim_test_utils::sample_scenario("bench");
    let names: Vec<String> = (0..n).map(|i| format!("blue_{i:05}")).collect();
    let platforms: Vec<(&str, f64, f64)> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let lat = 30.0 + (i % 200) as f64 * 0.05;
            let lon = -80.0 + (i / 200) as f64 * 0.05;
            (name.as_str(), lat, lon)
        })
        .collect();
    afsim_test_utils::populate(&mut scenario, &platforms);
    scenario
}

fn text(name: &str, value: &str) -> Field {
    Field {
        name: name.to_string(),
        value: FieldValue::Text(value.to_string()),
    }
}

fn number(name: &str, value: f64) -> Field {
    Field {
        name: name.to_string(),
        value: FieldValue::Number(value),
    }
}
