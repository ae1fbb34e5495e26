use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::model::Event;

/// Entries claiming a larger payload are treated as corruption.
const MAX_ENTRY_LEN: usize = 16 * 1024 * 1024;

/// Encode a single event as `[len][bincode][crc32]`. Returns bytes written.
fn encode_event(writer: &mut impl Write, event: &Event) -> io::Result<u64> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if payload.len() > MAX_ENTRY_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("event of {} bytes exceeds WAL entry limit", payload.len()),
        ));
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(payload.len() as u64 + 8)
}

/// Fill `buf` completely. `Ok(false)` on a clean or partial EOF.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Read the next intact entry and its encoded size. `Ok(None)` at the end of
/// the valid prefix: EOF, a torn tail, a CRC mismatch or an undecodable payload.
fn decode_next(reader: &mut impl Read) -> io::Result<Option<(Event, u64)>> {
    let mut word = [0u8; 4];
    if !read_full(reader, &mut word)? {
        return Ok(None);
    }
    let len = u32::from_le_bytes(word) as usize;
    if len > MAX_ENTRY_LEN {
        return Ok(None);
    }
    let mut payload = vec![0u8; len];
    if !read_full(reader, &mut payload)? || !read_full(reader, &mut word)? {
        return Ok(None);
    }
    if u32::from_le_bytes(word) != crc32fast::hash(&payload) {
        return Ok(None);
    }
    Ok(bincode::deserialize::<Event>(&payload)
        .ok()
        .map(|event| (event, len as u64 + 8)))
}

/// Append-only write-ahead log of store events.
///
/// Entry format: `[u32 LE: len][bincode: Event][u32 LE: crc32 of payload]`.
/// Replay stops at the first entry that is torn or fails its checksum, so a
/// crash mid-append loses at most the entry being written.
///
/// `durable_len` is the file length covered by the last successful
/// [`Wal::flush_sync`]. A failed write is undone with [`Wal::rollback`], which
/// drops the buffered bytes and truncates the file back to that length, so an
/// event reported as failed never reaches disk later.
pub struct Wal {
    writer: BufWriter<File>,
    path: PathBuf,
    durable_len: u64,
    unflushed_bytes: u64,
    unflushed_events: u64,
    /// Set while a rollback is owed; appends retry it first.
    torn: bool,
    appends_since_compact: u64,
}

impl Wal {
    /// Open (or create) the WAL file at `path` for appending.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let durable_len = file.metadata()?.len();
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            durable_len,
            unflushed_bytes: 0,
            unflushed_events: 0,
            torn: false,
            appends_since_compact: 0,
        })
    }

    /// A WAL whose first flush fails with `EBADF`: the writer sits on a
    /// read-only handle until [`Wal::rollback`] reopens the file.
    #[cfg(test)]
    pub(crate) fn open_failing(path: &Path) -> io::Result<Self> {
        let mut wal = Self::open(path)?;
        wal.writer = BufWriter::new(File::open(path)?);
        Ok(wal)
    }

    /// Append and fsync one event.
    #[cfg(test)]
    pub fn append(&mut self, event: &Event) -> io::Result<()> {
        self.append_buffered(event)?;
        self.flush_sync()
    }

    /// Buffer one event. Nothing is durable until [`Wal::flush_sync`].
    pub fn append_buffered(&mut self, event: &Event) -> io::Result<()> {
        if self.torn {
            self.rollback()?;
        }
        self.unflushed_bytes += encode_event(&mut self.writer, event)?;
        self.unflushed_events += 1;
        Ok(())
    }

    pub fn flush_sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.durable_len += self.unflushed_bytes;
        self.appends_since_compact += self.unflushed_events;
        self.unflushed_bytes = 0;
        self.unflushed_events = 0;
        Ok(())
    }

    /// Discard everything since the last successful flush: buffered bytes are
    /// dropped unwritten and any partial write is truncated away.
    pub fn rollback(&mut self) -> io::Result<()> {
        self.torn = true;
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let stale = std::mem::replace(&mut self.writer, BufWriter::new(file));
        // into_parts hands back the buffer instead of flushing it on drop.
        let _ = stale.into_parts();
        self.unflushed_bytes = 0;
        self.unflushed_events = 0;
        self.writer.get_ref().set_len(self.durable_len)?;
        self.torn = false;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn compact_path(path: &Path) -> PathBuf {
        path.with_extension("wal.tmp")
    }

    /// Write a snapshot to the side file and fsync it.
    pub fn write_compact_file(path: &Path, events: &[Event]) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(Self::compact_path(path))?);
        for event in events {
            encode_event(&mut writer, event)?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    /// Rename the side file over the log and reopen it for appending.
    pub fn swap_compact_file(&mut self) -> io::Result<()> {
        fs::rename(Self::compact_path(&self.path), &self.path)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.durable_len = file.metadata()?.len();
        self.writer = BufWriter::new(file);
        self.unflushed_bytes = 0;
        self.unflushed_events = 0;
        self.torn = false;
        self.appends_since_compact = 0;
        Ok(())
    }

    #[cfg(test)]
    pub fn compact(&mut self, events: &[Event]) -> io::Result<()> {
        Self::write_compact_file(&self.path, events)?;
        self.swap_compact_file()
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Every intact event on disk, in order. A missing file is an empty log.
    pub fn replay(path: &Path) -> io::Result<Vec<Event>> {
        Ok(Self::scan(path)?.0)
    }

    /// Replay, then cut off anything past the intact prefix so new appends
    /// are not hidden behind a torn entry.
    pub fn recover(path: &Path) -> io::Result<Vec<Event>> {
        let (events, valid_len, file_len) = Self::scan(path)?;
        if valid_len < file_len {
            tracing::warn!(
                "truncating {} bytes of torn WAL tail at offset {valid_len}",
                file_len - valid_len
            );
            OpenOptions::new().write(true).open(path)?.set_len(valid_len)?;
        }
        Ok(events)
    }

    /// `(events, intact prefix length, file length)`.
    fn scan(path: &Path) -> io::Result<(Vec<Event>, u64, u64)> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0, 0)),
            Err(e) => return Err(e),
        };
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let mut events = Vec::new();
        let mut valid_len = 0;
        while let Some((event, size)) = decode_next(&mut reader)? {
            events.push(event);
            valid_len += size;
        }
        Ok((events, valid_len, file_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn tmp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("roomdraw_test_wal");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        path
    }

    fn club(name: &str) -> Event {
        Event::ClubRegistered {
            name: name.into(),
            credit: 0,
        }
    }

    #[test]
    fn append_and_replay() {
        let path = tmp_path("append_and_replay.wal");
        let events = vec![
            club("chess"),
            Event::RoomRegistered {
                name: "C101".into(),
            },
            Event::RoomDayStatusSet {
                room: "C101".into(),
                days: vec!["7/14".into()],
                open: false,
            },
        ];
        {
            let mut wal = Wal::open(&path).unwrap();
            for e in &events {
                wal.append(e).unwrap();
            }
        }
        assert_eq!(Wal::replay(&path).unwrap(), events);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_discards_torn_tail() {
        let path = tmp_path("torn_tail.wal");
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&club("chess")).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[9u8, 0, 0, 0, 1, 2]).unwrap();
        }
        assert_eq!(Wal::replay(&path).unwrap(), vec![club("chess")]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn recover_cuts_torn_tail_before_new_appends() {
        let path = tmp_path("recover_torn.wal");
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&club("chess")).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[9u8, 0, 0, 0, 1, 2]).unwrap();
        }
        assert_eq!(Wal::recover(&path).unwrap(), vec![club("chess")]);
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&club("go")).unwrap();
        }
        assert_eq!(
            Wal::replay(&path).unwrap(),
            vec![club("chess"), club("go")]
        );
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_missing_file_is_empty() {
        let path = tmp_path("never_written.wal");
        assert!(Wal::replay(&path).unwrap().is_empty());
    }

    #[test]
    fn replay_stops_at_bad_crc() {
        let path = tmp_path("bad_crc.wal");
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&club("first")).unwrap();
        }
        {
            let payload = bincode::serialize(&club("second")).unwrap();
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
            f.write_all(&payload).unwrap();
            f.write_all(&0xDEADBEEFu32.to_le_bytes()).unwrap();
        }
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&club("third")).unwrap();
        }
        // Nothing after the corrupt entry is trusted.
        assert_eq!(Wal::replay(&path).unwrap(), vec![club("first")]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn replay_rejects_absurd_length() {
        let path = tmp_path("absurd_len.wal");
        {
            let mut f = File::create(&path).unwrap();
            f.write_all(&u32::MAX.to_le_bytes()).unwrap();
            f.write_all(&[0u8; 16]).unwrap();
        }
        assert!(Wal::replay(&path).unwrap().is_empty());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn compact_then_append() {
        let path = tmp_path("compact_then_append.wal");
        let snapshot = vec![Event::ClubRegistered {
            name: "chess".into(),
            credit: 14,
        }];
        {
            let mut wal = Wal::open(&path).unwrap();
            for i in 0..20 {
                wal.append(&Event::ClubRegistered {
                    name: "chess".into(),
                    credit: i,
                })
                .unwrap();
            }
            assert_eq!(wal.appends_since_compact(), 20);
            let before = fs::metadata(&path).unwrap().len();

            wal.compact(&snapshot).unwrap();
            assert_eq!(wal.appends_since_compact(), 0);
            assert!(fs::metadata(&path).unwrap().len() < before);

            wal.append(&club("go")).unwrap();
        }
        let replayed = Wal::replay(&path).unwrap();
        assert_eq!(replayed, vec![snapshot[0].clone(), club("go")]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn failed_flush_rolls_back_and_recovers() {
        let path = tmp_path("rollback.wal");
        {
            let mut wal = Wal::open(&path).unwrap();
            wal.append(&club("first")).unwrap();
        }
        let durable = fs::metadata(&path).unwrap().len();
        {
            let mut wal = Wal::open_failing(&path).unwrap();
            wal.append_buffered(&club("lost")).unwrap();
            assert!(wal.flush_sync().is_err());
            wal.rollback().unwrap();
            assert_eq!(fs::metadata(&path).unwrap().len(), durable);
            assert_eq!(wal.appends_since_compact(), 0);

            wal.append(&club("second")).unwrap();
            assert_eq!(wal.appends_since_compact(), 1);
        }
        // The failed event never reaches disk, not even after a later flush.
        assert_eq!(
            Wal::replay(&path).unwrap(),
            vec![club("first"), club("second")]
        );
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn buffered_appends_durable_after_flush() {
        let path = tmp_path("buffered.wal");
        let events: Vec<Event> = (0..5).map(|i| club(&format!("c{i}"))).collect();
        {
            let mut wal = Wal::open(&path).unwrap();
            for e in &events {
                wal.append_buffered(e).unwrap();
            }
            wal.flush_sync().unwrap();
        }
        assert_eq!(Wal::replay(&path).unwrap(), events);
        let _ = fs::remove_file(&path);
    }
}
