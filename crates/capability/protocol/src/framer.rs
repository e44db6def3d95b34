//! 行分帧
//!
//! 按字节缓冲，以 `\n` 切分完整记录，末尾不完整的半行保留到下一次读取。
//! 在字节层面切分，多字节字符（如 `°`）跨两次读取时也不会被破坏。
//! 超长半行被丢弃后，该记录剩余的字节直到下一个 `\n` 也一并丢弃。

use tracing::warn;

/// 单条未结束记录的最大字节数，超过后丢弃该半行。
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// 行分帧器。
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
    /// 正在跳过被丢弃记录的剩余部分
    discarding: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一次读取的字节，返回其中所有完整的行（不含 `\r\n` / `\n`）。
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut bytes = bytes;
        if self.discarding {
            match bytes.iter().position(|b| *b == b'\n') {
                Some(offset) => {
                    bytes = &bytes[offset + 1..];
                    self.discarding = false;
                }
                None => return Vec::new(),
            }
        }
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let mut line = &self.buffer[start..end];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            lines.push(String::from_utf8_lossy(line).into_owned());
            start = end + 1;
        }
        self.buffer.drain(..start);

        if self.buffer.len() > MAX_LINE_BYTES {
            warn!(
                target: "bridge.protocol",
                pending_bytes = self.buffer.len(),
                "unterminated_record_discarded"
            );
            self.buffer.clear();
            self.discarding = true;
        }
        lines
    }

    /// 当前缓冲中的半行字节数。
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}
