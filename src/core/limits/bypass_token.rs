use rand::seq::SliceRandom;
use rand::Rng;

/// Draw a `length`-character code from `alphabet`, never equal to `previous`.
///
/// The code is a shared secret handed out by the owner, not a credential, so
/// the thread-local RNG is enough.
pub fn generate_token(alphabet: &[char], length: usize, previous: Option<&str>) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let token = draw(&mut rng, alphabet, length);
        // An alphabet of one char can only ever produce one code.
        if previous != Some(token.as_str()) || alphabet.len() < 2 || length == 0 {
            return token;
        }
    }
}

fn draw<R: Rng + ?Sized>(rng: &mut R, alphabet: &[char], length: usize) -> String {
    (0..length)
        .filter_map(|_| alphabet.choose(rng).copied())
        .collect()
}
