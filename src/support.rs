/// String from single-byte chars.
/// Maps 0-255 to `char`, exceeding ascii,
/// since e.g. GoPro uses ISO8859-1 for some FourCC:s.
pub(crate) fn string_from_bytes(bytes: &[u8], ignore_null: bool) -> String {
    match ignore_null {
        true => bytes.iter()
            .filter_map(|b| if b == &0 {None} else {Some(*b as char)})
            .collect(),
        false => bytes.iter()
            .map(|b| *b as char)
            .collect(),
    }
}
