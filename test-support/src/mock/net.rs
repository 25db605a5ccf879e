//! 网络相关的 Mock 实现
//!
//! 注意：这里不直接依赖 `device` / `net` crate（避免循环依赖）。
//! 测试中由驱动实现 `NetDeviceOps`，把发送的帧转交给 [`FrameRecorder`]。

use std::sync::Mutex;

/// 一次发送调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFrame {
    /// 帧类型
    pub ty: u16,
    /// 帧数据
    pub data: Vec<u8>,
    /// 目的链路地址
    pub dst: Vec<u8>,
}

/// 记录发送调用的 Mock 设备后端
#[derive(Debug, Default)]
pub struct FrameRecorder {
    frames: Mutex<Vec<RecordedFrame>>,
    fail: Mutex<bool>,
}

impl FrameRecorder {
    /// 创建空的记录器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧
    pub fn record(&self, ty: u16, data: &[u8], dst: &[u8]) {
        self.frames.lock().unwrap().push(RecordedFrame {
            ty,
            data: data.to_vec(),
            dst: dst.to_vec(),
        });
    }

    /// 已记录的帧
    pub fn frames(&self) -> Vec<RecordedFrame> {
        self.frames.lock().unwrap().clone()
    }

    /// 已记录的帧数
    pub fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    /// 是否没有记录
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 设置后续发送是否失败
    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// 后续发送是否应当失败
    pub fn should_fail(&self) -> bool {
        *self.fail.lock().unwrap()
    }
}
