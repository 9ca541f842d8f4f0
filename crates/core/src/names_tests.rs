use super::*;

#[test]
fn names_are_adjective_underscore_noun() {
    for _ in 0..32 {
        let name = random_session_name();
        let (adjective, noun) = name.split_once('_').unwrap();
        assert!(ADJECTIVES.contains(&adjective));
        assert!(NOUNS.contains(&noun));
    }
}

#[test]
fn names_vary() {
    let mut seen = std::collections::HashSet::new();
    for _ in 0..64 {
        seen.insert(random_session_name());
    }
    // 50 * 45 combinations; 64 draws landing on one name would mean a
    // broken sampler.
    assert!(seen.len() > 1);
}
