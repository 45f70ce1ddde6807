use core::fmt::{Display, Formatter};

use toad_macros::rfc_7252_doc;

#[doc = rfc_7252_doc!("12.1")]
/// <details><summary><b>RFC7252 Section 12.1.1 Method Codes</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("12.1.1"))]
/// </details>
/// <details><summary><b>RFC7252 Section 12.1.2 Response Codes</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("12.1.2"))]
/// </details>
///
/// # Examples
/// ```
/// use newt_msg::Code;
/// assert_eq!(Code { class: 2, detail: 5 }.to_string(), "2.05".to_string())
/// ```
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Code {
  /// The "class" of message codes identify it as a request or response, and provides the class of response status:
  ///
  /// |class|meaning|
  /// |---|---|
  /// |`0`|Message is a request (or empty)|
  /// |`2`|Message is a success response|
  /// |`4`|Message is a client error response|
  /// |`5`|Message is a server error response|
  /// |`1`, `6`, `7`|Reserved, never legal|
  pub class: u8,

  /// 2-digit integer (range `[0, 32)`) that provides granular information about the response status.
  pub detail: u8,
}

/// Whether a code is for a request, response, or empty message
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum CodeKind {
  /// A request code (0.xx)
  Request,
  /// A response code ([2-5].xx)
  Response,
  /// EMPTY (0.00)
  Empty,
}

impl Code {
  /// Create a new Code
  ///
  /// ```
  /// use newt_msg::Code;
  ///
  /// let content = Code::new(2, 05);
  /// ```
  pub const fn new(class: u8, detail: u8) -> Self {
    Self { class, detail }
  }

  /// Get whether this code is for a request, response, or empty message
  ///
  /// ```
  /// use newt_msg::{code, CodeKind};
  ///
  /// assert_eq!(code::EMPTY.kind(), CodeKind::Empty);
  /// assert_eq!(code::GET.kind(), CodeKind::Request);
  /// assert_eq!(code::CONTENT.kind(), CodeKind::Response);
  /// ```
  pub fn kind(&self) -> CodeKind {
    match (self.class, self.detail) {
      | (0, 0) => CodeKind::Empty,
      | (0, _) => CodeKind::Request,
      | _ => CodeKind::Response,
    }
  }

  /// Is this code's class one of the reserved classes (1, 6, 7)?
  pub fn is_reserved_class(&self) -> bool {
    matches!(self.class, 1 | 6 | 7)
  }

  /// Get the human string representation of a message code
  ///
  /// # Returns
  /// A `char` array
  ///
  /// This is to avoid unnecessary heap allocation,
  /// you can create a `String` with `FromIterator::<String>::from_iter`,
  /// or use the [`Display`] implementation.
  /// ```
  /// use newt_msg::Code;
  ///
  /// let code = Code { class: 2, detail: 5 };
  /// let chars = code.to_human();
  /// let string = String::from_iter(chars);
  /// assert_eq!(string, "2.05".to_string());
  /// ```
  pub fn to_human(&self) -> [char; 4] {
    let to_char = |d: u8| char::from_digit(u32::from(d % 10), 10).unwrap_or('?');
    [to_char(self.class),
     '.',
     to_char(self.detail / 10),
     to_char(self.detail % 10)]
  }
}

impl Display for Code {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let [a, b, c, d] = self.to_human();
    write!(f, "{}{}{}{}", a, b, c, d)
  }
}

impl From<u8> for Code {
  fn from(b: u8) -> Self {
    let class = b >> 5;
    let detail = b & 0b0011111;

    Code { class, detail }
  }
}

impl From<Code> for u8 {
  fn from(code: Code) -> u8 {
    let class = code.class << 5;
    let detail = code.detail & 0b0011111;

    class | detail
  }
}

macro_rules! code {
  (rfc7252($section:literal) $name:ident = $c:literal * $d:literal) => {
    #[doc = toad_macros::rfc_7252_doc!($section)]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: Code = Code::new($c, $d);
  };
  (#[doc = $doc:expr] $name:ident = $c:literal * $d:literal) => {
    #[doc = $doc]
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: Code = Code::new($c, $d);
  };
}

// 0.xx
code!(#[doc = "Empty message, carries nothing after the header"] EMPTY = 0*00);
code!(#[doc = "GET method (RFC7252 section 5.8.1)"]                GET    = 0*01);
code!(#[doc = "POST method (RFC7252 section 5.8.2)"]               POST   = 0*02);
code!(#[doc = "PUT method (RFC7252 section 5.8.3)"]                PUT    = 0*03);
code!(#[doc = "DELETE method (RFC7252 section 5.8.4)"]             DELETE = 0*04);
code!(#[doc = "FETCH method (RFC8132 section 2)"]                  FETCH  = 0*05);
code!(#[doc = "PATCH method (RFC8132 section 3)"]                  PATCH  = 0*06);
code!(#[doc = "iPATCH method (RFC8132 section 3)"]                 IPATCH = 0*07);

// 2.xx
code!(rfc7252("5.9.1.1") CREATED = 2*01);
code!(rfc7252("5.9.1.2") DELETED = 2*02);
code!(rfc7252("5.9.1.3") VALID   = 2*03);
code!(rfc7252("5.9.1.4") CHANGED = 2*04);
code!(rfc7252("5.9.1.5") CONTENT = 2*05);
code!(#[doc = concat!(
  "## [2.31 Continue](https://www.rfc-editor.org/rfc/rfc7959#section-2.9.1)\n",
  "This success status code indicates that the transfer of this\n",
  "block of the request body was successful and that the server\n",
  "encourages sending further blocks, but that a final outcome of the\n",
  "whole block-wise request cannot yet be determined.  No payload is\n",
  "returned with this response code.",
)] CONTINUE = 2*31);

// 4.xx
code!(rfc7252("5.9.2.1")  BAD_REQUEST                = 4*00);
code!(rfc7252("5.9.2.2")  UNAUTHORIZED               = 4*01);
code!(rfc7252("5.9.2.3")  BAD_OPTION                 = 4*02);
code!(rfc7252("5.9.2.4")  FORBIDDEN                  = 4*03);
code!(rfc7252("5.9.2.5")  NOT_FOUND                  = 4*04);
code!(rfc7252("5.9.2.6")  METHOD_NOT_ALLOWED         = 4*05);
code!(rfc7252("5.9.2.7")  NOT_ACCEPTABLE             = 4*06);
code!(#[doc = concat!(
  "## [4.08 Request Entity Incomplete](https://www.rfc-editor.org/rfc/rfc7959#section-2.9.2)\n",
  "This client error status code indicates that the server has not\n",
  "received the blocks of the request body that it needs to proceed.\n",
  "The client has not sent all blocks, not sent them in the order\n",
  "required by the server, or has sent them long enough ago that the\n",
  "server has already discarded them.",
)] REQUEST_ENTITY_INCOMPLETE = 4*08);
code!(rfc7252("5.9.2.8")  PRECONDITION_FAILED        = 4*12);
code!(rfc7252("5.9.2.9")  REQUEST_ENTITY_TOO_LARGE   = 4*13);
code!(rfc7252("5.9.2.10") UNSUPPORTED_CONTENT_FORMAT = 4*15);

// 5.xx
code!(rfc7252("5.9.3.1") INTERNAL_SERVER_ERROR  =  5*00);
code!(rfc7252("5.9.3.2") NOT_IMPLEMENTED        =  5*01);
code!(rfc7252("5.9.3.3") BAD_GATEWAY            =  5*02);
code!(rfc7252("5.9.3.4") SERVICE_UNAVAILABLE    =  5*03);
code!(rfc7252("5.9.3.5") GATEWAY_TIMEOUT        =  5*04);
code!(rfc7252("5.9.3.6") PROXYING_NOT_SUPPORTED =  5*05);

/// Every code a message may legally carry
pub const KNOWN: [Code; 31] = [EMPTY,
                               GET,
                               POST,
                               PUT,
                               DELETE,
                               FETCH,
                               PATCH,
                               IPATCH,
                               CREATED,
                               DELETED,
                               VALID,
                               CHANGED,
                               CONTENT,
                               CONTINUE,
                               BAD_REQUEST,
                               UNAUTHORIZED,
                               BAD_OPTION,
                               FORBIDDEN,
                               NOT_FOUND,
                               METHOD_NOT_ALLOWED,
                               NOT_ACCEPTABLE,
                               REQUEST_ENTITY_INCOMPLETE,
                               PRECONDITION_FAILED,
                               REQUEST_ENTITY_TOO_LARGE,
                               UNSUPPORTED_CONTENT_FORMAT,
                               INTERNAL_SERVER_ERROR,
                               NOT_IMPLEMENTED,
                               BAD_GATEWAY,
                               SERVICE_UNAVAILABLE,
                               GATEWAY_TIMEOUT,
                               PROXYING_NOT_SUPPORTED];
