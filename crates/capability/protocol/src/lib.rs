//! # 上游行协议模块
//!
//! 网关以 TCP 文本行（`\n` 结尾）与桥接服务通信：
//!
//! ```text
//! 上游 → 桥接                           桥接 → 上游
//! [REGISTRO] id:categoria:porta         <id>:<ACAO>:<param>\n
//! [DESREGISTRO] id                      LISTAR:\n
//! [id] TIPO_LEITURA: valor unidade
//! [OK] ...
//! ```
//!
//! - [`LineFramer`]：按字节缓冲并切分完整行，保留跨读取的半行
//! - [`decode`]：单行 → [`Decoded`]
//! - [`encode`]：[`WireCommand`] → 线协议字符串

mod codec;
mod error;
mod framer;
mod types;

pub use codec::{COLOR_READING_KIND, decode, encode};
pub use error::ProtocolError;
pub use framer::{LineFramer, MAX_LINE_BYTES};
pub use types::*;
