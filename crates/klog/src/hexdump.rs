//! 帧数据的十六进制转储

use core::fmt::Write;

/// 把字节序列格式化为经典的十六进制转储
///
/// 每行 16 字节：偏移、十六进制、可打印 ASCII。
///
/// ```text
/// +------+-------------------------------------------------+------------------+
/// | 0000 | 45 00 00 30 00 80 00 00 ff 01 bd 4a 7f 00 00 01 | E..0.......J.... |
/// +------+-------------------------------------------------+------------------+
/// ```
pub fn hexdump(data: &[u8]) -> String {
    const BORDER: &str =
        "+------+-------------------------------------------------+------------------+\n";
    let mut out = String::with_capacity(BORDER.len() * (data.len() / 16 + 3));
    out.push_str(BORDER);
    for (row, chunk) in data.chunks(16).enumerate() {
        let _ = write!(out, "| {:04x} | ", row * 16);
        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, "{:02x} ", b);
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("| ");
        for i in 0..16 {
            match chunk.get(i) {
                Some(&b) if b.is_ascii_graphic() || b == b' ' => out.push(b as char),
                Some(_) => out.push('.'),
                None => out.push(' '),
            }
        }
        out.push_str(" |\n");
    }
    out.push_str(BORDER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hexdump_single_row() {
        let dump = hexdump(b"AB\x00");
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("| 0000 | 41 42 00 "));
        assert!(lines[1].ends_with("| AB.              |"));
    }

    #[test]
    fn test_hexdump_row_offsets() {
        let data: Vec<u8> = (0..40).collect();
        let dump = hexdump(&data);
        assert!(dump.contains("| 0010 | 10 11"));
        assert!(dump.contains("| 0020 | 20 21"));
        assert_eq!(dump.lines().count(), 5);
    }

    #[test]
    fn test_hexdump_empty() {
        assert_eq!(hexdump(&[]).lines().count(), 2);
    }
}
