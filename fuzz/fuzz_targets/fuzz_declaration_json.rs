#![no_main]

use libfuzzer_sys::fuzz_target;
use wirekit::{ContainerOptions, DependencyMap};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = ContainerOptions::from_json(text);

    let Ok(map) = DependencyMap::from_json(text) else {
        return;
    };
    let targets = map.targets();
    for (index, target) in targets.iter().enumerate() {
        assert!(!targets[..index].contains(target), "duplicate target {target}");
    }

    let mut merged = map.clone();
    merged.merge(&map);
    assert_eq!(merged.targets(), targets);
    for (target, dependency) in map.iter() {
        let after = merged.get(target).and_then(|d| d.bindings()).map_or(0, |b| b.len());
        let before = dependency.bindings().map_or(0, |b| b.len());
        assert_eq!(before, after);
    }
});
