/// 1/16 learning-rate exponential moving average in integer arithmetic.
///
/// A `previous` of zero means "no estimate yet" and bootstraps from the
/// sample. The blend is `sample/16 + previous*15/16`, each term truncated
/// by a right shift, so a repeated sample settles slightly below itself
/// rather than exactly on it.
pub fn ewma(previous: u64, sample: u64) -> u64 {
    if previous == 0 {
        return sample;
    }
    let blended = (u128::from(sample) >> 4) + ((u128::from(previous) * 15) >> 4);
    // sample/16 + 15*previous/16 never exceeds max(sample, previous)
    blended as u64
}
