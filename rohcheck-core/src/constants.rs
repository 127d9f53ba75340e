//! Constants and limits for link framing, comparison and the ROHC codec

/// Length of an Ethernet II header (destination, source, EtherType)
pub const ETHER_HDR_LEN: usize = 14;

/// Length of a Linux cooked-capture (SLL) header
pub const LINUX_COOKED_HDR_LEN: usize = 16;

/// Minimum Ethernet frame length without FCS; shorter payloads are padded up to it
pub const ETHER_FRAME_MIN_LEN: usize = 60;

/// Fixed IPv6 header length
pub const IPV6_HDR_LEN: usize = 40;

/// Minimum IPv4 header length
pub const IPV4_MIN_HDR_LEN: usize = 20;

/// Protocol/type tag written into the link header of emitted ROHC frames
///
/// 0x162F is not an assigned EtherType, so captures written by the harness
/// are never mistaken for IP traffic.
pub const HARNESS_LINK_TAG: [u8; 2] = [0x16, 0x2F];

/// Maximum number of leading bytes rendered by the packet comparator
pub const COMPARE_MAX_BYTES: usize = 180;

/// Bytes per row in a comparison report
pub const COMPARE_ROW_BYTES: usize = 4;

/// Largest ROHC packet or decompressed packet the harness handles
pub const MAX_ROHC_SIZE: usize = 5 * 4096;

/// Default number of ROHC contexts per compressor
pub const DEFAULT_MAX_CONTEXTS: usize = 15;

/// Upper bound accepted for `--max-contexts`
pub const MAX_CONTEXTS_LIMIT: usize = 16384;

/// Largest CID encodable with small CIDs
pub const SMALL_CID_MAX: u16 = 15;

/// Largest CID encodable with large CIDs (two-octet SDVL)
pub const LARGE_CID_MAX: u16 = 16383;

/// Number of IR packets sent before a context is assumed established
/// when no acknowledgement came back
pub const IR_REPETITIONS: u32 = 3;

/// Exit status reported when a run is skipped
pub const EXIT_SKIPPED: i32 = 77;

/// libpcap link-type numbers (DLT_*) the harness understands
pub mod dlt {
    /// DLT_EN10MB
    pub const ETHERNET: u32 = 1;
    /// DLT_RAW as written by most platforms
    pub const RAW_BSD: u32 = 12;
    /// DLT_RAW on OpenBSD
    pub const RAW_OPENBSD: u32 = 14;
    /// LINKTYPE_RAW
    pub const RAW: u32 = 101;
    /// DLT_LINUX_SLL
    pub const LINUX_SLL: u32 = 113;
}

/// ROHC packet type octets and masks
pub mod rohc {
    /// Segment marker, bits 7..1 of the first octet
    pub const SEGMENT: u8 = 0xFE >> 1;
    /// Padding octet
    pub const PADDING: u8 = 0xE0;
    /// Feedback marker, bits 7..3 of the first octet
    pub const FEEDBACK: u8 = 0xF0 >> 3;
    /// IR packet, bits 7..1 of the first octet
    pub const IR: u8 = 0xFC >> 1;
    /// IR-DYN packet octet
    pub const IR_DYN: u8 = 0xF8;
    /// Add-CID prefix, bits 7..4 of the first octet
    pub const ADD_CID: u8 = 0xE0;
    /// Profile 0x0000, uncompressed
    pub const PROFILE_UNCOMPRESSED: u8 = 0x00;
    /// FEEDBACK-1 payload acknowledging a context
    pub const FEEDBACK_ACK: u8 = 0x00;
}
