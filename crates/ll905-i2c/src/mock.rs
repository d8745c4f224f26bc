//! 仿真 LIDAR-Lite 设备
//!
//! 在寄存器层面模拟设备行为：
//! - 写 `[0x00, 0x04]` 触发测量
//! - 写 `[0x00, 0x00]` 复位
//! - 写 `[0x8F]` 后读 2 字节返回距离（大端，厘米）
//!
//! 克隆出的句柄共享同一设备状态，测试可以在驱动持有总线时注入故障、读取计数。

use crate::{BusDeviceError, BusDeviceErrorKind, BusError, I2cTransport};
use ll905_protocol::{MeasureValue, Register, encode_distance_raw};
use std::collections::VecDeque;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Default)]
struct SimState {
    /// 预设的距离序列（厘米），读完后使用 `default_cm`
    script_cm: VecDeque<u16>,
    default_cm: u16,
    measurement_pending: bool,
    triggers: u64,
    resets: u64,
    reads: u64,
    fail_writes: u32,
    fail_reads: u32,
    offline: bool,
}

/// 仿真设备（共享状态句柄）
#[derive(Debug, Clone)]
pub struct SimulatedLidar {
    address: u16,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedLidar {
    /// 创建仿真设备，默认读数为 `default_cm` 厘米
    pub fn new(address: u16, default_cm: u16) -> Self {
        Self {
            address,
            state: Arc::new(Mutex::new(SimState {
                default_cm,
                ..SimState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock()
    }

    /// 设置默认读数（厘米）
    pub fn set_distance_cm(&self, centimeters: u16) {
        self.state().default_cm = centimeters;
    }

    /// 追加一组按顺序返回的读数（厘米）
    pub fn push_distances_cm(&self, readings: impl IntoIterator<Item = u16>) {
        self.state().script_cm.extend(readings);
    }

    /// 之后的 `count` 次写传输返回 NACK
    pub fn fail_next_writes(&self, count: u32) {
        self.state().fail_writes = count;
    }

    /// 之后的 `count` 次读传输返回 NACK
    pub fn fail_next_reads(&self, count: u32) {
        self.state().fail_reads = count;
    }

    /// 模拟设备掉线（所有传输失败）
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// 收到的测量触发次数
    pub fn trigger_count(&self) -> u64 {
        self.state().triggers
    }

    /// 收到的复位命令次数
    pub fn reset_count(&self) -> u64 {
        self.state().resets
    }

    /// 成功的距离读取次数
    pub fn read_count(&self) -> u64 {
        self.state().reads
    }

    /// 是否有已触发但尚未读取的测量
    pub fn measurement_pending(&self) -> bool {
        self.state().measurement_pending
    }

    fn nack(&self) -> BusError {
        BusError::Device(BusDeviceError::new(
            BusDeviceErrorKind::NoAcknowledge,
            format!("no ACK from address 0x{:02X}", self.address),
        ))
    }
}

impl I2cTransport for SimulatedLidar {
    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), BusError> {
        let nack = self.nack();
        let mut state = self.state();

        if state.offline {
            return Err(nack);
        }

        let register = match write.first() {
            Some(&byte) => Register::try_from(byte).map_err(|_| {
                BusError::Device(BusDeviceError::new(
                    BusDeviceErrorKind::InvalidRegister,
                    format!("register 0x{:02X} is not simulated", byte),
                ))
            })?,
            None => {
                return Err(BusError::Device(BusDeviceError::new(
                    BusDeviceErrorKind::InvalidLength,
                    "read without register select",
                )));
            },
        };

        match (register, &write[1..], read.len()) {
            (Register::Measure, &[value], 0) => {
                if state.fail_writes > 0 {
                    state.fail_writes -= 1;
                    return Err(nack);
                }

                match MeasureValue::try_from(value) {
                    Ok(MeasureValue::Acquire) => {
                        state.triggers += 1;
                        state.measurement_pending = true;
                    },
                    Ok(MeasureValue::ResetFpga) => {
                        state.resets += 1;
                        state.measurement_pending = false;
                    },
                    Err(_) => {
                        return Err(BusError::Device(BusDeviceError::new(
                            BusDeviceErrorKind::InvalidRegister,
                            format!("unsupported measure value 0x{:02X}", value),
                        )));
                    },
                }
                trace!("sim: measure register <- 0x{:02X}", value);
                Ok(())
            },
            (Register::DistanceHigh, &[], 2) => {
                if state.fail_reads > 0 {
                    state.fail_reads -= 1;
                    return Err(nack);
                }

                let centimeters = match state.script_cm.pop_front() {
                    Some(cm) => cm,
                    None => state.default_cm,
                };
                read.copy_from_slice(&encode_distance_raw(centimeters));
                state.reads += 1;
                state.measurement_pending = false;
                trace!("sim: distance -> {} cm", centimeters);
                Ok(())
            },
            _ => Err(BusError::Device(BusDeviceError::new(
                BusDeviceErrorKind::InvalidLength,
                format!(
                    "unexpected transfer: write {} bytes, read {} bytes",
                    write.len(),
                    read.len()
                ),
            ))),
        }
    }

    fn address(&self) -> u16 {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ll905_protocol::{decode_distance, encode_distance_request, encode_measure_command};

    #[test]
    fn test_trigger_then_read() {
        let mut sim = SimulatedLidar::new(0x62, 250);
        sim.transfer(&encode_measure_command(), &mut []).unwrap();
        assert_eq!(sim.trigger_count(), 1);
        assert!(sim.measurement_pending());

        let mut raw = [0u8; 2];
        sim.transfer(&encode_distance_request(), &mut raw).unwrap();
        assert_eq!(decode_distance(raw), 2.5);
        assert_eq!(sim.read_count(), 1);
        assert!(!sim.measurement_pending());
    }

    #[test]
    fn test_scripted_readings_then_default() {
        let mut sim = SimulatedLidar::new(0x62, 100);
        sim.push_distances_cm([10, 20]);

        let mut raw = [0u8; 2];
        let mut read = |sim: &mut SimulatedLidar| {
            sim.transfer(&encode_distance_request(), &mut raw).unwrap();
            u16::from_be_bytes(raw)
        };
        assert_eq!(read(&mut sim), 10);
        assert_eq!(read(&mut sim), 20);
        assert_eq!(read(&mut sim), 100);
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let mut sim = SimulatedLidar::new(0x62, 100);
        sim.fail_next_writes(1);
        assert!(sim.transfer(&encode_measure_command(), &mut []).is_err());
        assert!(sim.transfer(&encode_measure_command(), &mut []).is_ok());
        assert_eq!(sim.trigger_count(), 1);
    }

    #[test]
    fn test_offline_device() {
        let mut sim = SimulatedLidar::new(0x62, 100);
        let handle = sim.clone();
        handle.set_offline(true);
        match sim.transfer(&encode_measure_command(), &mut []) {
            Err(BusError::Device(e)) => assert_eq!(e.kind, BusDeviceErrorKind::NoAcknowledge),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_register() {
        let mut sim = SimulatedLidar::new(0x62, 100);
        let mut raw = [0u8; 2];
        match sim.transfer(&[0x42], &mut raw) {
            Err(BusError::Device(e)) => assert_eq!(e.kind, BusDeviceErrorKind::InvalidRegister),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_clones_share_state_across_threads() {
        let sim = SimulatedLidar::new(0x62, 100);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mut bus = sim.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        bus.transfer(&encode_measure_command(), &mut []).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sim.trigger_count(), 100);
    }

    #[test]
    fn test_reset_command() {
        let mut sim = SimulatedLidar::new(0x62, 100);
        sim.transfer(&ll905_protocol::encode_reset_command(), &mut [])
            .unwrap();
        assert_eq!(sim.reset_count(), 1);
        assert_eq!(sim.trigger_count(), 0);
    }
}
