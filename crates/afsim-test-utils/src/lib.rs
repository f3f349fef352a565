//! Test utilities for AFSIM driver development.
//!
//! Provides ready-made scenarios, writers for text result files, and
//! shell scripts that impersonate the simulator binary so the run
//! controller can be exercised without an AFSIM installation.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod simulator;

use afsim_core::{ComponentKind, EntityManager, Parameters, PlatformSpec, Scenario};
use serde_json::json;

pub use fixtures::{platform_state_csv, write_csv, EvtBuilder};
pub use simulator::{fake_simulator, scratch, FakeBehavior};

/// Two opposing platforms with a mover, a sensor and a weapon each.
pub fn sample_scenario(name: &str) -> Scenario {
    let mut scenario = Scenario::new(name, 600.0)
        .expect("valid sample settings")
        .with_description("blue versus red intercept");
    scenario.metadata.insert("random_seed".into(), json!(1234));
    populate(&mut scenario, &[("blue_1", 38.8, -77.0), ("red_1", 39.4, -76.1)]);
    scenario
}

/// Add `platforms` (name, lat, lon) with a standard component loadout.
pub fn populate(scenario: &mut Scenario, platforms: &[(&str, f64, f64)]) {
    let mut em = EntityManager::new(scenario);
    for &(name, lat, lon) in platforms {
        em.add_platform(
            PlatformSpec::new(name)
                .with_type("WSF_PLATFORM")
                .at(lat, lon, 9000.0)
                .param("side", if name.starts_with("red") { "red" } else { "blue" }),
        )
        .expect("sample platform");
        let mut mover = Parameters::new();
        mover.insert("speed".into(), json!(250.0));
        em.add_component(name, ComponentKind::Mover, Some("wsf_air_mover".into()), mover)
            .expect("mover");
        em.add_component(name, ComponentKind::Sensor, None, Parameters::new())
            .expect("sensor");
        em.add_component(name, ComponentKind::Weapon, None, Parameters::new())
            .expect("weapon");
    }
}
