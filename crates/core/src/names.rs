//! Docker-style `adjective_noun` session names.

use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "admiring", "adoring", "agitated", "amazing", "bold", "brave", "busy", "calm", "charming",
    "clever", "cool", "curious", "dazzling", "dreamy", "eager", "elated", "elegant", "epic",
    "focused", "friendly", "gallant", "gifted", "goofy", "gracious", "happy", "hopeful",
    "inspiring", "jolly", "keen", "kind", "lucid", "magical", "modest", "nifty", "optimistic",
    "patient", "peaceful", "practical", "quirky", "relaxed", "serene", "sharp", "silly",
    "sleepy", "stoic", "sweet", "tender", "trusting", "vigilant", "zealous",
];

const NOUNS: &[&str] = &[
    "albatross", "antelope", "badger", "beaver", "bison", "camel", "cheetah", "condor",
    "cormorant", "coyote", "crane", "dolphin", "falcon", "ferret", "finch", "gazelle", "gecko",
    "heron", "ibex", "jackal", "kestrel", "lemur", "llama", "lynx", "manatee", "marmot",
    "meerkat", "mongoose", "narwhal", "ocelot", "otter", "panda", "pelican", "penguin",
    "platypus", "puffin", "quokka", "raccoon", "salamander", "seal", "stork", "tapir",
    "toucan", "walrus", "wombat",
];

/// Sample a random `adjective_noun` name.
pub fn random_session_name() -> String {
    let mut rng = rand::thread_rng();
    // Both pools are non-empty constants; choose cannot fail.
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("busy");
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or("panda");
    format!("{}_{}", adjective, noun)
}

#[cfg(test)]
#[path = "names_tests.rs"]
mod tests;
