use rand::Rng;

pub const PLAYER_NAMES: [&str; 24] = [
    "QuantifiedQuantum",
    "Kalamata",
    "EmoAImusic",
    "MD",
    "Torva",
    "Haidar",
    "BoboBear",
    "Mohamed",
    "Alucard",
    "Kevin",
    "Barry",
    "Uniqueux",
    "JanHoleman",
    "TheJAM",
    "megansub",
    "Dereck",
    "Kyle",
    "Tuleku",
    "Travis",
    "Valor",
    "Lukey",
    "Mosh",
    "Alazr",
    "Ahmed",
];

pub const PURSUER_NAMES: [&str; 14] = [
    "HAL9000", "Skynet", "Predator", "DeepBlue", "AlphaGo", "Watson", "Siri", "nAIma", "Aldan",
    "mAIa", "nAlma", "gAIl", "bAIley", "dAIsy",
];

pub fn random_player_name<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    PLAYER_NAMES[rng.random_range(0..PLAYER_NAMES.len())]
}

pub fn random_pursuer_name<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    PURSUER_NAMES[rng.random_range(0..PURSUER_NAMES.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn picks_are_reproducible_for_fixed_seed() {
        let mut a = ChaCha12Rng::seed_from_u64(5);
        let mut b = ChaCha12Rng::seed_from_u64(5);
        for _ in 0..20 {
            let name = random_pursuer_name(&mut a);
            assert_eq!(name, random_pursuer_name(&mut b));
            assert!(PURSUER_NAMES.contains(&name));
            assert!(PLAYER_NAMES.contains(&random_player_name(&mut a)));
            random_player_name(&mut b);
        }
    }
}
