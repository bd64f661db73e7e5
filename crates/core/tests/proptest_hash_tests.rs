//! Property-based tests for config hash stability.
//!
//! These tests verify the behavioral contracts of config hashing:
//! - Determinism: the same configuration always produces the same hash
//! - Sensitivity: changing an output-relevant field changes the hash
//! - Order invariance: engine option insertion order doesn't affect the hash

use proptest::prelude::*;
use serde_json::json;
use ytx_core::{AppConfig, ComputeType, Device, TimestampPolicy, config_hash};

// =============================================================================
// Strategies for generating test data
// =============================================================================

fn engine_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("whisper".to_string()), Just("gemini".to_string())]
}

fn model_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("tiny".to_string()),
        Just("small".to_string()),
        Just("large-v3".to_string()),
        Just("gemini-2.5-flash".to_string()),
        "[a-z][a-z0-9.-]{0,12}".prop_map(String::from),
    ]
}

fn device_strategy() -> impl Strategy<Value = Device> {
    prop_oneof![
        Just(Device::Cpu),
        Just(Device::Auto),
        Just(Device::Cuda),
        Just(Device::Metal),
    ]
}

fn compute_strategy() -> impl Strategy<Value = ComputeType> {
    prop_oneof![
        Just(ComputeType::Auto),
        Just(ComputeType::Int8),
        Just(ComputeType::Int8Float16),
        Just(ComputeType::Float16),
        Just(ComputeType::Float32),
    ]
}

fn options_strategy() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec(("[a-z_]{1,10}", any::<i64>()), 0..6)
}

fn config_strategy() -> impl Strategy<Value = AppConfig> {
    (
        engine_strategy(),
        model_strategy(),
        prop::option::of("[a-z]{2}"),
        device_strategy(),
        compute_strategy(),
        prop::bool::ANY,
        options_strategy(),
    )
        .prop_map(
            |(engine, model, language, device, compute_type, chunked, options)| AppConfig {
                engine,
                model,
                language,
                device,
                compute_type,
                timestamps: if chunked {
                    TimestampPolicy::Chunked
                } else {
                    TimestampPolicy::Native
                },
                engine_options: options.into_iter().map(|(k, v)| (k, json!(v))).collect(),
                ..AppConfig::default()
            },
        )
}

// =============================================================================
// Property Tests: Determinism
// =============================================================================

proptest! {
    /// Contract: the same configuration always produces the same hash
    #[test]
    fn hash_is_deterministic(config in config_strategy()) {
        let first = config_hash(&config).expect("hash should succeed");
        let second = config_hash(&config.clone()).expect("hash should succeed on clone");
        prop_assert_eq!(first, second);
    }

    /// Contract: engine option insertion order never affects the hash
    #[test]
    fn hash_is_option_order_independent(
        base in config_strategy(),
        options in options_strategy(),
    ) {
        let mut forward = base.clone();
        forward.engine_options.clear();
        for (k, v) in &options {
            forward.engine_options.insert(k.clone(), json!(v));
        }

        let mut reversed = base;
        reversed.engine_options.clear();
        // Later duplicates win in `forward`, so mirror that when reversing
        let mut seen = std::collections::BTreeSet::new();
        let deduped: Vec<_> = options
            .iter()
            .rev()
            .filter(|(k, _)| seen.insert(k.clone()))
            .collect();
        for (k, v) in deduped {
            reversed.engine_options.insert(k.clone(), json!(v));
        }

        prop_assert_eq!(
            config_hash(&forward).expect("hash should succeed"),
            config_hash(&reversed).expect("hash should succeed")
        );
    }

    /// Contract: fields that do not change output do not change the hash
    #[test]
    fn hash_ignores_runtime_switches(config in config_strategy(), ttl in any::<u64>()) {
        let mut modified = config.clone();
        modified.fallback = !config.fallback;
        modified.cache_ttl_seconds = Some(ttl);
        prop_assert_eq!(
            config_hash(&config).expect("hash should succeed"),
            config_hash(&modified).expect("hash should succeed")
        );
    }
}

// =============================================================================
// Property Tests: Sensitivity
// =============================================================================

proptest! {
    /// Contract: a different model produces a different hash
    #[test]
    fn different_model_produces_different_hash(
        base in config_strategy(),
        model in model_strategy(),
    ) {
        prop_assume!(base.model != model);
        let modified = AppConfig { model, ..base.clone() };
        prop_assert_ne!(
            config_hash(&base).expect("hash should succeed"),
            config_hash(&modified).expect("hash should succeed")
        );
    }

    /// Contract: a different device produces a different hash
    #[test]
    fn different_device_produces_different_hash(
        base in config_strategy(),
        device in device_strategy(),
    ) {
        prop_assume!(base.device != device);
        let modified = AppConfig { device, ..base.clone() };
        prop_assert_ne!(
            config_hash(&base).expect("hash should succeed"),
            config_hash(&modified).expect("hash should succeed")
        );
    }

    /// Contract: adding an engine option produces a different hash
    #[test]
    fn new_option_produces_different_hash(
        base in config_strategy(),
        name in "[a-z_]{1,10}",
        value in any::<i64>(),
    ) {
        prop_assume!(base.engine_options.get(&name) != Some(&json!(value)));
        let mut modified = base.clone();
        modified.engine_options.insert(name, json!(value));
        prop_assert_ne!(
            config_hash(&base).expect("hash should succeed"),
            config_hash(&modified).expect("hash should succeed")
        );
    }

    /// Contract: setting a language differs from letting the engine detect it
    #[test]
    fn language_affects_hash(base in config_strategy(), lang in "[a-z]{2}") {
        let detect = AppConfig { language: None, ..base.clone() };
        let fixed = AppConfig { language: Some(lang), ..base };
        prop_assert_ne!(
            config_hash(&detect).expect("hash should succeed"),
            config_hash(&fixed).expect("hash should succeed")
        );
    }
}
