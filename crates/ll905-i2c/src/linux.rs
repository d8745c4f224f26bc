//! Linux i2c-dev 后端
//!
//! 通过 `/dev/i2c-N` 和 `I2C_RDWR` ioctl 实现组合传输（写寄存器地址后重复起始读取），
//! 保证寄存器选择与数据读取之间不会插入其它主机的传输。

use crate::{BusDeviceError, BusDeviceErrorKind, BusError, I2cTransport};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use tracing::{debug, trace};

/// `linux/i2c-dev.h`
const I2C_RDWR: u64 = 0x0707;
/// `linux/i2c.h`
const I2C_M_RD: u16 = 0x0001;

#[repr(C)]
struct I2cMsg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

#[repr(C)]
struct I2cRdwrIoctlData {
    msgs: *mut I2cMsg,
    nmsgs: u32,
}

/// Linux i2c-dev 总线适配器
///
/// 地址和重试次数在构造时确定。每次 `transfer` 失败后最多重试 `retries` 次。
pub struct LinuxI2cBus {
    file: File,
    bus: u32,
    address: u16,
    retries: u8,
}

impl LinuxI2cBus {
    /// 打开 `/dev/i2c-{bus}`
    pub fn new(bus: u32, address: u16, retries: u8) -> Result<Self, BusError> {
        let path = format!("/dev/i2c-{}", bus);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => BusError::Device(BusDeviceError::new(
                    BusDeviceErrorKind::NotFound,
                    format!("{} not found", path),
                )),
                io::ErrorKind::PermissionDenied => BusError::Device(BusDeviceError::new(
                    BusDeviceErrorKind::AccessDenied,
                    format!("permission denied opening {}", path),
                )),
                _ => BusError::Io(e),
            })?;

        debug!(
            "Opened {} (address 0x{:02X}, retries {})",
            path, address, retries
        );

        Ok(Self {
            file,
            bus,
            address,
            retries,
        })
    }

    /// 总线编号
    pub fn bus(&self) -> u32 {
        self.bus
    }

    fn transfer_once(&self, write: &[u8], read: &mut [u8]) -> Result<(), BusError> {
        if write.len() > u16::MAX as usize || read.len() > u16::MAX as usize {
            return Err(BusError::Device(BusDeviceError::new(
                BusDeviceErrorKind::InvalidLength,
                "transfer longer than 65535 bytes",
            )));
        }

        // i2c_msg.buf 是 *mut，写消息需要一份可变副本
        let mut write_buf = write.to_vec();
        let mut msgs: Vec<I2cMsg> = Vec::with_capacity(2);

        if !write_buf.is_empty() {
            msgs.push(I2cMsg {
                addr: self.address,
                flags: 0,
                len: write_buf.len() as u16,
                buf: write_buf.as_mut_ptr(),
            });
        }

        if !read.is_empty() {
            msgs.push(I2cMsg {
                addr: self.address,
                flags: I2C_M_RD,
                len: read.len() as u16,
                buf: read.as_mut_ptr(),
            });
        }

        if msgs.is_empty() {
            return Ok(());
        }

        let mut data = I2cRdwrIoctlData {
            msgs: msgs.as_mut_ptr(),
            nmsgs: msgs.len() as u32,
        };

        // SAFETY: msgs 指向的缓冲区（write_buf / read）在 ioctl 返回前一直有效，
        // 长度字段与缓冲区长度一致。
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                I2C_RDWR as _,
                &mut data as *mut I2cRdwrIoctlData,
            )
        };

        if ret < 0 {
            return Err(map_errno(io::Error::last_os_error(), self.address));
        }

        Ok(())
    }
}

fn map_errno(err: io::Error, address: u16) -> BusError {
    match err.raw_os_error() {
        Some(libc::ENXIO) | Some(libc::EREMOTEIO) => BusError::Device(BusDeviceError::new(
            BusDeviceErrorKind::NoAcknowledge,
            format!("no ACK from address 0x{:02X}", address),
        )),
        Some(libc::ETIMEDOUT) => BusError::Timeout,
        _ => BusError::Io(err),
    }
}

impl I2cTransport for LinuxI2cBus {
    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), BusError> {
        let attempts = u32::from(self.retries) + 1;
        let mut attempt = 1;

        loop {
            match self.transfer_once(write, read) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    trace!("i2c transfer attempt {}/{} failed: {}", attempt, attempts, e);
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }

    fn address(&self) -> u16 {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_bus_is_not_found() {
        match LinuxI2cBus::new(9_999, 0x62, 3) {
            Err(BusError::Device(e)) => {
                assert!(matches!(
                    e.kind,
                    BusDeviceErrorKind::NotFound | BusDeviceErrorKind::AccessDenied
                ));
                assert!(e.is_fatal());
            },
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("/dev/i2c-9999 should not exist"),
        }
    }

    #[test]
    fn test_map_errno() {
        let nack = map_errno(io::Error::from_raw_os_error(libc::ENXIO), 0x62);
        match nack {
            BusError::Device(e) => assert_eq!(e.kind, BusDeviceErrorKind::NoAcknowledge),
            other => panic!("unexpected: {}", other),
        }

        let timeout = map_errno(io::Error::from_raw_os_error(libc::ETIMEDOUT), 0x62);
        assert!(matches!(timeout, BusError::Timeout));

        let other = map_errno(io::Error::from_raw_os_error(libc::EIO), 0x62);
        assert!(matches!(other, BusError::Io(_)));
    }
}
