//! 校验和等通用工具

/// 16 位反码和校验
///
/// 按网络字节序把 `data` 视为 16 位字序列求和（奇数长度时末字节补零），
/// 折叠进位后取反。`init` 可用于累加伪首部等预先计算的部分和。
///
/// 对一个校验和字段正确的首部再次计算，结果为 0。
pub fn cksum16(data: &[u8], init: u32) -> u16 {
    let mut sum = init as u64;
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum += u16::from_be_bytes([word[0], word[1]]) as u64;
    }
    if let [last] = chunks.remainder() {
        sum += (*last as u64) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
