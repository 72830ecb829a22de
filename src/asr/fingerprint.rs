/// Compute the content fingerprint of an audio payload.
///
/// This is the standard reflected CRC-32 (polynomial 0xEDB88320, initial
/// value 0xFFFFFFFF, final XOR 0xFFFFFFFF), rendered as 8 lowercase hex
/// digits so the identity matches common object-storage checksum
/// conventions. Identical bytes always produce the identical fingerprint.
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    format!("{:08x}", hasher.finalize())
}
