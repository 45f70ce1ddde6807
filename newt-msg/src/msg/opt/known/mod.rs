/// Block1 & Block2 option values
pub mod block;
pub use block::*;

use crate::OptNumber;

macro_rules! opt {
  (rfc7252($section:literal) $name:ident = $n:literal) => {
    #[doc = ::toad_macros::rfc_7252_doc!($section)]
    pub const $name: OptNumber = OptNumber($n);
  };
  (#[doc = $doc:expr] $name:ident = $n:literal) => {
    #[doc = $doc]
    pub const $name: OptNumber = OptNumber($n);
  };
}

opt!(rfc7252("5.10.1") URI_HOST = 3);
opt!(#[doc = concat!(
       toad_macros::rfc_7252_doc!("5.10.6"),
       "\n<details><summary>ETag as a Request Option</summary>\n\n",
       toad_macros::rfc_7252_doc!("5.10.6.2"),
       "\n</details><details><summary>ETag as a Response Option</summary>\n\n",
       toad_macros::rfc_7252_doc!("5.10.6.1"),
       "</details>"
     )]
     ETAG = 4);
opt!(#[doc = "Observe ([RFC7641](https://www.rfc-editor.org/rfc/rfc7641#section-2)); only its value is surfaced"]
     OBSERVE = 6);
opt!(#[doc = "See [`URI_HOST`]"]
     URI_PORT = 7);
opt!(rfc7252("5.10.7") LOCATION_PATH = 8);
opt!(#[doc = "See [`URI_HOST`]"]
     URI_PATH = 11);
opt!(rfc7252("5.10.3") CONTENT_FORMAT = 12);
opt!(rfc7252("5.10.5") MAX_AGE = 14);
opt!(#[doc = "See [`URI_HOST`]"]
     URI_QUERY = 15);
opt!(rfc7252("5.10.4") ACCEPT = 17);
opt!(#[doc = "See [`LOCATION_PATH`]"]
     LOCATION_QUERY = 20);
opt!(#[doc = "Block2 ([RFC7959](https://www.rfc-editor.org/rfc/rfc7959#section-2.2)): block of a response body, see [`Block`]"]
     BLOCK2 = 23);
opt!(#[doc = "Block1 ([RFC7959](https://www.rfc-editor.org/rfc/rfc7959#section-2.2)): block of a request body, see [`Block`]"]
     BLOCK1 = 27);
opt!(#[doc = "Size2 ([RFC7959](https://www.rfc-editor.org/rfc/rfc7959#section-4)): total size of a response body"]
     SIZE2 = 28);
opt!(rfc7252("5.10.2") PROXY_URI = 35);
opt!(rfc7252("5.10.9") SIZE1 = 60);

/// How an option's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptKind {
  /// Big-endian unsigned integer with leading zero bytes stripped
  Uint,
  /// UTF-8 string
  String,
  /// Opaque bytes
  Opaque,
}

/// Everything the codec knows about an option number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OptDef {
  /// The option number
  pub number: OptNumber,
  /// Value format
  pub kind: OptKind,
  /// Minimum value length in bytes
  pub min: u16,
  /// Maximum value length in bytes
  pub max: u16,
  /// May this option appear more than once in a message?
  pub repeatable: bool,
  /// Character joining repeated values into a single string, e.g. `/` for Uri-Path
  pub separator: Option<u8>,
}

impl OptDef {
  const fn new(number: OptNumber,
               kind: OptKind,
               min: u16,
               max: u16,
               repeatable: bool,
               separator: Option<u8>)
               -> Self {
    Self { number,
           kind,
           min,
           max,
           repeatable,
           separator }
  }

  /// Is `len` a legal length for this option's value?
  pub fn len_ok(&self, len: usize) -> bool {
    len >= self.min as usize && len <= self.max as usize
  }
}

/// All options understood by this crate, in ascending order of number.
///
/// Messages containing any other option are rejected.
pub static TABLE: [OptDef; 16] =
  [OptDef::new(URI_HOST, OptKind::String, 1, 255, false, None),
   OptDef::new(ETAG, OptKind::Opaque, 1, 8, true, None),
   OptDef::new(OBSERVE, OptKind::Uint, 0, 3, false, None),
   OptDef::new(URI_PORT, OptKind::Uint, 0, 2, false, None),
   OptDef::new(LOCATION_PATH, OptKind::String, 0, 255, true, Some(b'/')),
   OptDef::new(URI_PATH, OptKind::String, 0, 255, true, Some(b'/')),
   OptDef::new(CONTENT_FORMAT, OptKind::Uint, 0, 2, false, None),
   OptDef::new(MAX_AGE, OptKind::Uint, 0, 4, false, None),
   OptDef::new(URI_QUERY, OptKind::String, 0, 255, true, Some(b'&')),
   OptDef::new(ACCEPT, OptKind::Uint, 0, 2, false, None),
   OptDef::new(LOCATION_QUERY, OptKind::String, 0, 255, true, Some(b'&')),
   OptDef::new(BLOCK2, OptKind::Uint, 0, 3, false, None),
   OptDef::new(BLOCK1, OptKind::Uint, 0, 3, false, None),
   OptDef::new(SIZE2, OptKind::Uint, 0, 4, false, None),
   OptDef::new(PROXY_URI, OptKind::String, 1, 1034, false, None),
   OptDef::new(SIZE1, OptKind::Uint, 0, 4, false, None)];

/// Look up an option number in [`TABLE`]
///
/// ```
/// use newt_msg::{known, OptNumber};
///
/// assert_eq!(known::lookup(known::URI_PATH).unwrap().separator, Some(b'/'));
/// assert!(known::lookup(OptNumber(9)).is_none());
/// ```
pub fn lookup(number: OptNumber) -> Option<&'static OptDef> {
  TABLE.binary_search_by_key(&number, |def| def.number)
       .ok()
       .map(|ix| &TABLE[ix])
}
