use rand::Rng;
use tracing::debug;

/// Execute the shuffle stage
///
/// Applies a uniform Fisher-Yates permutation so no positional bias from
/// the generation request survives into the quiz. Order carries no meaning
/// afterwards.
pub fn execute_shuffle<T, R>(items: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    if items.len() < 2 {
        return;
    }
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
    debug!("Shuffled {} items", items.len());
}
