//! Serial link access: one scoped connection per poll, one line per connection.

use crate::config::LinkConfig;
use crate::errors::LinkError;
use log::debug;
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io::{self, BufRead, BufReader};
use std::time::{Duration, Instant};

/// Source of raw record lines for the polling loop.
///
/// A session is one open connection. It is created per poll and dropped when
/// the poll ends, so the underlying device is released between polls.
pub trait LinkReader: Send {
    type Session: BufRead;

    fn connect(&mut self) -> Result<Self::Session, LinkError>;

    /// How long one line may take to arrive.
    fn read_timeout(&self) -> Duration;

    /// Human readable name of the link, used in log lines.
    fn name(&self) -> &str;

    /// Opens a session, reads one line and closes the session again.
    fn read_line(&mut self) -> Result<String, LinkError> {
        let mut session = self.connect()?;
        read_record_line(&mut session, self.name(), self.read_timeout())
    }
}

/// Reads from a serial port (a USB adapter or a Bluetooth SPP/rfcomm device).
#[derive(Debug, Clone)]
pub struct SerialLink {
    config: LinkConfig,
    port_path: String,
}

impl SerialLink {
    pub fn new(config: LinkConfig) -> Self {
        let port_path = port_path(&config.port);
        Self { config, port_path }
    }
}

impl LinkReader for SerialLink {
    type Session = BufReader<Box<dyn SerialPort>>;

    fn connect(&mut self) -> Result<Self::Session, LinkError> {
        debug!(
            "Opening {} at {} baud (timeout {:?})",
            self.port_path,
            self.config.baud_rate,
            self.config.read_timeout()
        );

        let port = serialport::new(&self.port_path, self.config.baud_rate)
            .timeout(self.config.read_timeout())
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| LinkError::Open {
                port: self.config.port.clone(),
                source: e,
            })?;

        Ok(BufReader::new(port))
    }

    fn read_timeout(&self) -> Duration {
        self.config.read_timeout()
    }

    fn name(&self) -> &str {
        &self.config.port
    }
}

// On Windows, COM ports >= 10 need the \\.\COMxx format
#[cfg(target_os = "windows")]
fn port_path(port: &str) -> String {
    if port.starts_with("COM") && !port.starts_with(r"\\") {
        format!(r"\\.\{}", port)
    } else {
        port.to_string()
    }
}

#[cfg(not(target_os = "windows"))]
fn port_path(port: &str) -> String {
    port.to_string()
}

/// Reads bytes up to and including the next `\n`, decodes them as UTF-8 and
/// returns the line with surrounding whitespace removed.
///
/// The whole line must arrive within `timeout`. A timeout is reported even
/// when part of a line was received, since a truncated record could still
/// parse into wrong values. End of stream after some bytes yields those bytes
/// as the final line; end of stream with nothing read is `Disconnected`.
///
/// The deadline is checked between reads. A serial port also applies its own
/// per-read timeout, so the worst case is about `timeout` plus one read window.
pub fn read_record_line<R: BufRead>(reader: &mut R, port: &str, timeout: Duration) -> Result<String, LinkError> {
    let deadline = Instant::now() + timeout;
    let mut buf = Vec::new();

    loop {
        let (used, complete) = match reader.fill_buf() {
            Ok(available) if available.is_empty() => {
                if buf.is_empty() {
                    return Err(LinkError::Disconnected { port: port.to_string() });
                }
                break;
            }
            Ok(available) => match available.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    buf.extend_from_slice(&available[..=pos]);
                    (pos + 1, true)
                }
                None => {
                    buf.extend_from_slice(available);
                    (available.len(), false)
                }
            },
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                debug!("Read window on {} closed with {} partial bytes", port, buf.len());
                return Err(LinkError::Timeout {
                    port: port.to_string(),
                    timeout,
                });
            }
            Err(e) => {
                return Err(LinkError::Io {
                    port: port.to_string(),
                    source: e,
                })
            }
        };

        reader.consume(used);
        if complete {
            break;
        }
        if Instant::now() >= deadline {
            debug!("Line on {} still incomplete after {:?} ({} bytes)", port, timeout, buf.len());
            return Err(LinkError::Timeout {
                port: port.to_string(),
                timeout,
            });
        }
    }

    let line = String::from_utf8(buf).map_err(|e| LinkError::Decode {
        port: port.to_string(),
        source: e,
    })?;
    Ok(line.trim().to_string())
}

/// Lists the serial ports the OS currently reports.
pub fn available_ports() -> Result<Vec<SerialPortInfo>, serialport::Error> {
    serialport::available_ports()
}

/// One-line description of a port for `--list-ports`.
pub fn describe_port(port: &SerialPortInfo) -> String {
    match &port.port_type {
        SerialPortType::UsbPort(info) => {
            let mut description = format!(
                "{} - USB (VID: 0x{:04x}, PID: 0x{:04x})",
                port.port_name, info.vid, info.pid
            );
            if let Some(ref manufacturer) = info.manufacturer {
                description.push_str(&format!(", Manufacturer: {}", manufacturer));
            }
            if let Some(ref product) = info.product {
                description.push_str(&format!(", Product: {}", product));
            }
            if let Some(ref serial) = info.serial_number {
                description.push_str(&format!(", Serial: {}", serial));
            }
            description
        }
        SerialPortType::BluetoothPort => format!("{} - Bluetooth", port.port_name),
        SerialPortType::PciPort => format!("{} - PCI", port.port_name),
        SerialPortType::Unknown => format!("{} - Unknown", port.port_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    const TIMEOUT: Duration = Duration::from_secs(1);

    // Hands out scripted chunks, then a fixed error kind forever
    struct ScriptedPort {
        chunks: Vec<Vec<u8>>,
        then: io::ErrorKind,
    }

    impl Read for ScriptedPort {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Err(io::Error::new(self.then, "scripted"));
            }
            let chunk = self.chunks.remove(0);
            out[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_reads_first_line_only() {
        let mut reader = Cursor::new(b"1,42.5,88.0,23,550\r\n0,1,2,3,4\n".to_vec());
        let line = read_record_line(&mut reader, "test", TIMEOUT).unwrap();
        assert_eq!(line, "1,42.5,88.0,23,550");
        let next = read_record_line(&mut reader, "test", TIMEOUT).unwrap();
        assert_eq!(next, "0,1,2,3,4");
    }

    #[test]
    fn test_line_split_across_reads_is_joined() {
        let port = ScriptedPort {
            chunks: vec![b"1,42.5,".to_vec(), b"97.0,23,550\n".to_vec()],
            then: io::ErrorKind::TimedOut,
        };
        let mut reader = BufReader::new(port);
        assert_eq!(read_record_line(&mut reader, "test", TIMEOUT).unwrap(), "1,42.5,97.0,23,550");
    }

    #[test]
    fn test_silent_port_times_out() {
        let port = ScriptedPort {
            chunks: Vec::new(),
            then: io::ErrorKind::TimedOut,
        };
        let mut reader = BufReader::new(port);
        let err = read_record_line(&mut reader, "COM6", TIMEOUT).unwrap_err();
        assert!(matches!(err, LinkError::Timeout { ref port, .. } if port == "COM6"));
    }

    // Trickles one byte per read and never sends a newline
    struct TricklingPort {
        delay: Duration,
    }

    impl Read for TricklingPort {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            std::thread::sleep(self.delay);
            out[0] = b'1';
            Ok(1)
        }
    }

    #[test]
    fn test_slow_line_hits_the_deadline_across_reads() {
        let timeout = Duration::from_millis(100);
        let mut reader = BufReader::new(TricklingPort {
            delay: Duration::from_millis(20),
        });
        let started = Instant::now();
        let result = read_record_line(&mut reader, "COM6", timeout);

        assert!(matches!(result, Err(LinkError::Timeout { ref port, .. }) if port == "COM6"));
        assert!(started.elapsed() >= timeout);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_partial_line_before_timeout_is_not_returned() {
        let port = ScriptedPort {
            chunks: vec![b"1,42.5,88".to_vec()],
            then: io::ErrorKind::TimedOut,
        };
        let mut reader = BufReader::new(port);
        assert!(matches!(
            read_record_line(&mut reader, "test", TIMEOUT),
            Err(LinkError::Timeout { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_a_decode_error() {
        let mut reader = Cursor::new(vec![0x31, 0x2c, 0xff, 0xfe, b'\n']);
        assert!(matches!(
            read_record_line(&mut reader, "test", TIMEOUT),
            Err(LinkError::Decode { .. })
        ));
    }

    #[test]
    fn test_empty_stream_is_disconnected() {
        let mut reader = Cursor::new(Vec::new());
        assert!(matches!(
            read_record_line(&mut reader, "test", TIMEOUT),
            Err(LinkError::Disconnected { .. })
        ));
    }

    #[test]
    fn test_unterminated_final_line_is_returned() {
        let mut reader = Cursor::new(b"0,1,2,3,4".to_vec());
        assert_eq!(read_record_line(&mut reader, "test", TIMEOUT).unwrap(), "0,1,2,3,4");
    }

    #[test]
    fn test_other_io_errors_are_reported() {
        let port = ScriptedPort {
            chunks: Vec::new(),
            then: io::ErrorKind::BrokenPipe,
        };
        let mut reader = BufReader::new(port);
        assert!(matches!(
            read_record_line(&mut reader, "test", TIMEOUT),
            Err(LinkError::Io { .. })
        ));
    }

    #[test]
    fn test_opening_missing_port_fails_without_panicking() {
        let mut link = SerialLink::new(LinkConfig {
            port: "/dev/sensor-dashboard-missing-port".to_string(),
            ..LinkConfig::default()
        });
        assert!(matches!(link.read_line(), Err(LinkError::Open { .. })));
        assert_eq!(link.name(), "/dev/sensor-dashboard-missing-port");
    }

    #[test]
    fn test_describe_bluetooth_port() {
        let info = SerialPortInfo {
            port_name: "/dev/rfcomm0".to_string(),
            port_type: SerialPortType::BluetoothPort,
        };
        assert_eq!(describe_port(&info), "/dev/rfcomm0 - Bluetooth");
    }
}
