/// Rounds `size` up to the next multiple of eight, the alignment used by
/// version 1 object header and attribute messages.
pub fn padded_size(size: usize) -> usize {
    let padding = 8;
    (size + padding - 1) / padding * padding
}
