use rand::distributions::Alphanumeric;
use rand::Rng;

const TOKEN_LEN: usize = 8;

/// Short random string that keeps test data unique between runs
pub fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
