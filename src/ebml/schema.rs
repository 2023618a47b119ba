//! WebM element schema
//!
//! The subset of the Matroska/WebM schema the relay needs: enough structure
//! to resolve nesting depth (in particular, to know when an unknown-size
//! `Segment` or `Cluster` ends) and to name the elements the keeper reacts
//! to. Elements not in the table are relayed byte-exactly as leaves at the
//! current depth.

/// Element ids (marker bit included, per Matroska convention)
pub const EBML: u32 = 0x1A45_DFA3;
pub const SEGMENT: u32 = 0x1853_8067;
pub const SEEK_HEAD: u32 = 0x114D_9B74;
pub const INFO: u32 = 0x1549_A966;
pub const TRACKS: u32 = 0x1654_AE6B;
pub const CLUSTER: u32 = 0x1F43_B675;
pub const CUES: u32 = 0x1C53_BB6B;
pub const TAGS: u32 = 0x1254_C367;
pub const TRACK_ENTRY: u32 = 0xAE;
pub const BLOCK_GROUP: u32 = 0xA0;
pub const SIMPLE_BLOCK: u32 = 0xA3;
pub const BLOCK: u32 = 0xA1;
pub const VOID: u32 = 0xEC;
pub const CRC32: u32 = 0xBF;

/// Whether an element is a container or carries a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Master,
    Leaf,
}

/// Where an element may occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// Top-level (level 0)
    Root,
    /// Child of the given master element
    Master(u32),
    /// Anywhere (Void, CRC-32)
    Global,
}

/// Schema entry for a known element
#[derive(Debug, Clone, Copy)]
pub struct ElementDef {
    pub name: &'static str,
    pub kind: Kind,
    pub parent: Parent,
}

const fn def(name: &'static str, kind: Kind, parent: Parent) -> ElementDef {
    ElementDef { name, kind, parent }
}

/// Look up a known element id
pub fn lookup(id: u32) -> Option<ElementDef> {
    use Kind::Leaf;
    use Kind::Master as M;
    use Parent::Global;
    use Parent::Master;
    use Parent::Root;

    let d = match id {
        EBML => def("EBML", M, Root),
        0x4286 => def("EBMLVersion", Leaf, Master(EBML)),
        0x42F7 => def("EBMLReadVersion", Leaf, Master(EBML)),
        0x42F2 => def("EBMLMaxIDLength", Leaf, Master(EBML)),
        0x42F3 => def("EBMLMaxSizeLength", Leaf, Master(EBML)),
        0x4282 => def("DocType", Leaf, Master(EBML)),
        0x4287 => def("DocTypeVersion", Leaf, Master(EBML)),
        0x4285 => def("DocTypeReadVersion", Leaf, Master(EBML)),

        SEGMENT => def("Segment", M, Root),

        SEEK_HEAD => def("SeekHead", M, Master(SEGMENT)),
        0x4DBB => def("Seek", M, Master(SEEK_HEAD)),
        0x53AB => def("SeekID", Leaf, Master(0x4DBB)),
        0x53AC => def("SeekPosition", Leaf, Master(0x4DBB)),

        INFO => def("Info", M, Master(SEGMENT)),
        0x2AD7B1 => def("TimecodeScale", Leaf, Master(INFO)),
        0x4489 => def("Duration", Leaf, Master(INFO)),
        0x4461 => def("DateUTC", Leaf, Master(INFO)),
        0x7BA9 => def("Title", Leaf, Master(INFO)),
        0x4D80 => def("MuxingApp", Leaf, Master(INFO)),
        0x5741 => def("WritingApp", Leaf, Master(INFO)),

        TRACKS => def("Tracks", M, Master(SEGMENT)),
        TRACK_ENTRY => def("TrackEntry", M, Master(TRACKS)),
        0xD7 => def("TrackNumber", Leaf, Master(TRACK_ENTRY)),
        0x73C5 => def("TrackUID", Leaf, Master(TRACK_ENTRY)),
        0x83 => def("TrackType", Leaf, Master(TRACK_ENTRY)),
        0x9C => def("FlagLacing", Leaf, Master(TRACK_ENTRY)),
        0x22B59C => def("Language", Leaf, Master(TRACK_ENTRY)),
        0x86 => def("CodecID", Leaf, Master(TRACK_ENTRY)),
        0x63A2 => def("CodecPrivate", Leaf, Master(TRACK_ENTRY)),
        0x23E383 => def("DefaultDuration", Leaf, Master(TRACK_ENTRY)),
        0xE0 => def("Video", M, Master(TRACK_ENTRY)),
        0xB0 => def("PixelWidth", Leaf, Master(0xE0)),
        0xBA => def("PixelHeight", Leaf, Master(0xE0)),
        0x54B0 => def("DisplayWidth", Leaf, Master(0xE0)),
        0x54BA => def("DisplayHeight", Leaf, Master(0xE0)),
        0xE1 => def("Audio", M, Master(TRACK_ENTRY)),
        0xB5 => def("SamplingFrequency", Leaf, Master(0xE1)),
        0x9F => def("Channels", Leaf, Master(0xE1)),
        0x6264 => def("BitDepth", Leaf, Master(0xE1)),

        CLUSTER => def("Cluster", M, Master(SEGMENT)),
        0xE7 => def("Timecode", Leaf, Master(CLUSTER)),
        0xA7 => def("Position", Leaf, Master(CLUSTER)),
        0xAB => def("PrevSize", Leaf, Master(CLUSTER)),
        SIMPLE_BLOCK => def("SimpleBlock", Leaf, Master(CLUSTER)),
        BLOCK_GROUP => def("BlockGroup", M, Master(CLUSTER)),
        BLOCK => def("Block", Leaf, Master(BLOCK_GROUP)),
        0x9B => def("BlockDuration", Leaf, Master(BLOCK_GROUP)),
        0xFB => def("ReferenceBlock", Leaf, Master(BLOCK_GROUP)),

        CUES => def("Cues", M, Master(SEGMENT)),
        0xBB => def("CuePoint", M, Master(CUES)),
        0xB3 => def("CueTime", Leaf, Master(0xBB)),
        0xB7 => def("CueTrackPositions", M, Master(0xBB)),
        0xF7 => def("CueTrack", Leaf, Master(0xB7)),
        0xF1 => def("CueClusterPosition", Leaf, Master(0xB7)),

        TAGS => def("Tags", M, Master(SEGMENT)),
        0x7373 => def("Tag", M, Master(TAGS)),

        VOID => def("Void", Leaf, Global),
        CRC32 => def("CRC-32", Leaf, Global),

        _ => return None,
    };
    Some(d)
}

/// Name for an element id, `"Unknown"` if not in the table
pub fn name(id: u32) -> &'static str {
    lookup(id).map(|d| d.name).unwrap_or("Unknown")
}
