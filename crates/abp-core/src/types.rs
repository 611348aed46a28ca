//! Core type definitions for the filter matching engine.
//!
//! These bitmasks map directly to the parser's routing table (see the
//! compiler's `classify` routing table) and to the snapshot binary format.

// =============================================================================
// Filter Type (bucket classification)
// =============================================================================

bitflags::bitflags! {
    /// Classification bits attached to every parsed rule. A record is routed
    /// into exactly one index bucket based on this mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FilterType: u16 {
        /// Blank line; discarded.
        const EMPTY = 1 << 0;
        /// Comment line (`!`, `[...]`, or `# `); discarded.
        const COMMENT = 1 << 1;
        /// `/.../` regex body, delegated to the `regex` crate.
        const REGEX = 1 << 2;
        /// `##selector` element-hiding rule.
        const ELEMENT_HIDING = 1 << 3;
        /// `#@#selector` element-hiding exception.
        const ELEMENT_HIDING_EXCEPTION = 1 << 4;
        /// `$$` HTML-filtering literal rule.
        const HTML_FILTERING = 1 << 5;
        /// `@@` exception rule.
        const EXCEPTION = 1 << 6;
        /// Leading `|` (not `||`).
        const LEFT_ANCHORED = 1 << 7;
        /// Trailing `|` in the pattern body.
        const RIGHT_ANCHORED = 1 << 8;
        /// Leading `||`.
        const HOST_ANCHORED = 1 << 9;
        /// `||host^` with nothing but the host left in the pattern.
        const HOST_ONLY = 1 << 10;

        /// Lines that never reach bucket routing.
        const NON_ROUTABLE = Self::EMPTY.bits() | Self::COMMENT.bits();
    }
}

// =============================================================================
// Filter / anti-filter option masks
// =============================================================================

bitflags::bitflags! {
    /// Resource-type and party classifiers carried by a rule's `$...`
    /// options segment. `filter_option` holds positive requirements,
    /// `anti_filter_option` holds the `~`-negated counterparts - both use
    /// this same bit layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FilterOption: u32 {
        const SCRIPT = 1 << 0;
        const IMAGE = 1 << 1;
        const STYLESHEET = 1 << 2;
        const OBJECT = 1 << 3;
        const XMLHTTPREQUEST = 1 << 4;
        const SUBDOCUMENT = 1 << 5;
        const DOCUMENT = 1 << 6;
        const OTHER = 1 << 7;
        const PING = 1 << 8;
        const WEBSOCKET = 1 << 9;
        const WEBRTC = 1 << 10;
        const FONT = 1 << 11;
        const MEDIA = 1 << 12;
        const POPUP = 1 << 13;
        const COLLAPSE = 1 << 14;
        const IMPORTANT = 1 << 15;
        const MATCH_CASE = 1 << 16;

        /// Request matches third-party to its context domain.
        const THIRD_PARTY = 1 << 20;
        /// Request matches first-party to its context domain.
        const NOT_THIRD_PARTY = 1 << 21;

        /// All resource-type bits (used to detect "no resource constraint").
        const RESOURCE_TYPES = Self::SCRIPT.bits() | Self::IMAGE.bits() | Self::STYLESHEET.bits()
            | Self::OBJECT.bits() | Self::XMLHTTPREQUEST.bits() | Self::SUBDOCUMENT.bits()
            | Self::DOCUMENT.bits() | Self::OTHER.bits() | Self::PING.bits()
            | Self::WEBSOCKET.bits() | Self::WEBRTC.bits() | Self::FONT.bits() | Self::MEDIA.bits();
    }
}

impl FilterOption {
    /// Resource-type / option name -> bit, used by the options-segment parser.
    /// Returns `None` for names this engine does not recognize at all
    /// (distinct from `redirect=`/`csp=`/`domain=`/`tag=`, which are handled
    /// separately because they carry a value rather than setting a bit).
    pub fn from_option_name(name: &str) -> Option<Self> {
        Some(match name {
            "script" => Self::SCRIPT,
            "image" => Self::IMAGE,
            "stylesheet" => Self::STYLESHEET,
            "object" => Self::OBJECT,
            "xmlhttprequest" | "xhr" => Self::XMLHTTPREQUEST,
            "subdocument" => Self::SUBDOCUMENT,
            "document" | "main_frame" => Self::DOCUMENT,
            "other" => Self::OTHER,
            "ping" => Self::PING,
            "websocket" => Self::WEBSOCKET,
            "webrtc" => Self::WEBRTC,
            "font" => Self::FONT,
            "media" => Self::MEDIA,
            "popup" => Self::POPUP,
            "collapse" => Self::COLLAPSE,
            "important" => Self::IMPORTANT,
            "match-case" | "match_case" => Self::MATCH_CASE,
            "third-party" | "thirdparty" | "3p" => Self::THIRD_PARTY,
            "first-party" | "firstparty" | "1p" => Self::NOT_THIRD_PARTY,
            _ => return None,
        })
    }
}

// =============================================================================
// Scheme Masks
// =============================================================================

bitflags::bitflags! {
    /// URL scheme mask. Only `{http, https, ws, wss, ftp}` are blockable
    /// schemes (the observable scheme whitelist).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SchemeMask: u8 {
        const HTTP = 1 << 0;
        const HTTPS = 1 << 1;
        const WS = 1 << 2;
        const WSS = 1 << 3;
        const FTP = 1 << 4;
        const DATA = 1 << 5;

        const BLOCKABLE = Self::HTTP.bits() | Self::HTTPS.bits() | Self::WS.bits()
            | Self::WSS.bits() | Self::FTP.bits();
        const ALL = 0xFF;
    }
}

// =============================================================================
// Request Context
// =============================================================================

/// Context for a single request being matched. The caller is responsible
/// for populating `request_option`; `party` may be left unset (both bits
/// clear) to let the matcher derive it from `site_domain` vs the request
/// host, per the matcher's preparation phase.
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    /// Full request URL, including scheme.
    pub url: &'a str,
    /// Context/initiator domain (the spec's `contextDomain`), if known.
    pub site_domain: Option<&'a str>,
    /// Resource-type / party bits the caller already knows. Party bits are
    /// filled in by the matcher if both are unset and `site_domain` is
    /// present.
    pub request_option: FilterOption,
}

/// Final decision for a matched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    Allow,
    Block,
}

/// Observable constants, per the external-interfaces section.
pub const FINGERPRINT_SIZE: usize = 6;
pub const MAX_LINE_LENGTH: usize = 2048;
