use crate::error::Result;
use crate::structs::CaptureRecord;

use pcap_file::pcap::{PcapHeader, PcapPacket, PcapReader, PcapWriter};
use pcap_file::DataLink;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

pub const SNAPLEN: u32 = 65535;
/// Size of the pcap global header
pub const FILE_HEADER_LEN: u64 = 24;
/// Size of the pcap record header (timestamp, captured length, original length)
pub const RECORD_HEADER_LEN: u64 = 16;

/// Sequential sink of timestamped frames
pub trait CaptureSink {
    fn write_record(&mut self, timestamp: Duration, frame: &[u8]) -> Result<()>;
}

/// A pcap file with Ethernet link type and microsecond timestamps
pub struct PcapSink<W: Write> {
    writer: PcapWriter<W>,
    packets: u64,
    bytes: u64,
}

impl PcapSink<BufWriter<File>> {
    /// Create (or truncate) a pcap file. The parent directory is created if needed.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file_out = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        log::trace!("Saving into {}", path.display());
        PcapSink::new(BufWriter::new(file_out))
    }
}

impl<W: Write> PcapSink<W> {
    pub fn new(writer: W) -> Result<Self> {
        let header = PcapHeader {
            snaplen: SNAPLEN,
            datalink: DataLink::ETHERNET,
            ..Default::default()
        };
        Ok(PcapSink {
            writer: PcapWriter::with_header(writer, header)?,
            packets: 0,
            bytes: FILE_HEADER_LEN,
        })
    }

    /// Number of records written so far
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Size of the file so far, header included
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Flush and give back the underlying writer
    pub fn finish(self) -> Result<W> {
        let mut writer = self.writer.into_writer();
        writer.flush()?;
        Ok(writer)
    }
}

impl<W: Write> CaptureSink for PcapSink<W> {
    fn write_record(&mut self, timestamp: Duration, frame: &[u8]) -> Result<()> {
        self.writer
            .write_packet(&PcapPacket::new(timestamp, frame.len() as u32, frame))?;
        self.packets += 1;
        self.bytes += RECORD_HEADER_LEN + frame.len() as u64;
        Ok(())
    }
}

/// Sequential reader of a pcap file
pub struct CaptureReader<R: Read> {
    reader: PcapReader<R>,
}

impl<R: Read> CaptureReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(CaptureReader {
            reader: PcapReader::new(reader)?,
        })
    }
}

/// Open a pcap file for reading
pub fn open_capture(path: &Path) -> Result<CaptureReader<BufReader<File>>> {
    CaptureReader::new(BufReader::new(File::open(path)?))
}

impl<R: Read> Iterator for CaptureReader<R> {
    type Item = Result<CaptureRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_packet().map(|packet| {
            packet
                .map(|p| CaptureRecord {
                    timestamp: p.timestamp,
                    data: p.data.into_owned(),
                })
                .map_err(Into::into)
        })
    }
}
