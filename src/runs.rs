//! Encoding of non-resident data runs.
//!
//! A run is stored as one header byte — high nibble the byte-width of the
//! LCN field, low nibble the byte-width of the cluster-count field —
//! followed by the count and then the LCN, each little-endian in exactly as
//! many bytes as the nibble says. Only a single contiguous run per attribute
//! is supported; every metafile extent this formatter places is contiguous.

/// Minimal number of bytes needed to represent `value` (1..=4).
///
/// Values of 2^32 and above are outside the fixed volume layouts this
/// formatter supports and indicate a broken caller.
fn run_field_width(value: u64) -> u8 {
    assert!(value < 1 << 32, "run field {value:#x} exceeds 32 bits");
    if value < 1 << 8 {
        1
    } else if value < 1 << 16 {
        2
    } else if value < 1 << 24 {
        3
    } else {
        4
    }
}

/// Encode a single contiguous run starting at `start_lcn` spanning
/// `cluster_count` clusters.
///
/// No terminating zero-header entry is emitted; the caller reserves an
/// exactly sized slot for the run list and the rest of the slot stays zero.
pub fn encode_single_run(start_lcn: u64, cluster_count: u64) -> Vec<u8> {
    let lcn_width = run_field_width(start_lcn);
    let count_width = run_field_width(cluster_count);

    let mut out = Vec::with_capacity(1 + lcn_width as usize + count_width as usize);
    out.push((lcn_width << 4) | count_width);
    out.extend_from_slice(&cluster_count.to_le_bytes()[..count_width as usize]);
    out.extend_from_slice(&start_lcn.to_le_bytes()[..lcn_width as usize]);
    out
}

/// Decode a single run produced by [`encode_single_run`]. Returns
/// `(start_lcn, cluster_count)`, or `None` if the buffer is malformed.
pub fn decode_single_run(bytes: &[u8]) -> Option<(u64, u64)> {
    let header = *bytes.first()?;
    let lcn_width = (header >> 4) as usize;
    let count_width = (header & 0x0F) as usize;
    if lcn_width == 0 || count_width == 0 || bytes.len() < 1 + lcn_width + count_width {
        return None;
    }

    let mut count = [0u8; 8];
    count[..count_width].copy_from_slice(&bytes[1..1 + count_width]);
    let mut lcn = [0u8; 8];
    lcn[..lcn_width].copy_from_slice(&bytes[1 + count_width..1 + count_width + lcn_width]);

    Some((u64::from_le_bytes(lcn), u64::from_le_bytes(count)))
}
