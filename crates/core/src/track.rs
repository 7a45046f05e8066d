use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::packetizer::{PacketSink, Packetizer, ProcessStatus, TrackHeader};

/// One audio track of the output file.
///
/// Owns the track's packetizer behind a mutex so a registry can be shared
/// across threads. The packetizer itself does no locking.
pub struct Track {
    id: u32,
    packetizer: Mutex<Box<dyn Packetizer>>,
}

impl Track {
    pub fn new(id: u32, packetizer: Box<dyn Packetizer>) -> Self {
        Self {
            id,
            packetizer: Mutex::new(packetizer),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Feed a chunk of this track's elementary stream.
    pub fn process(
        &self,
        chunk: &[u8],
        timestamp_ms: Option<i64>,
        sink: &mut dyn PacketSink,
    ) -> ProcessStatus {
        self.packetizer.lock().process(chunk, timestamp_ms, sink)
    }

    pub fn header(&self) -> TrackHeader {
        self.packetizer.lock().header().clone()
    }

    pub fn packets_emitted(&self) -> u64 {
        self.packetizer.lock().packets_emitted()
    }

    pub fn buffered(&self) -> usize {
        self.packetizer.lock().buffered()
    }
}

/// Registry of tracks keyed by id, used to route demultiplexed chunks.
#[derive(Clone, Default)]
pub struct TrackRegistry {
    tracks: Arc<RwLock<HashMap<u32, Arc<Track>>>>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track. Ids must be unique.
    pub fn add(&self, id: u32, packetizer: Box<dyn Packetizer>) -> Result<Arc<Track>> {
        let mut tracks = self.tracks.write();
        if tracks.contains_key(&id) {
            return Err(Error::DuplicateTrack(id));
        }
        let codec_id = packetizer.header().codec_id;
        let track = Arc::new(Track::new(id, packetizer));
        tracks.insert(id, track.clone());
        tracing::info!(id, codec_id, "track registered");
        Ok(track)
    }

    pub fn get(&self, id: u32) -> Option<Arc<Track>> {
        self.tracks.read().get(&id).cloned()
    }

    pub fn remove(&self, id: u32) -> Option<Arc<Track>> {
        let removed = self.tracks.write().remove(&id);
        if removed.is_some() {
            tracing::debug!(id, "track removed");
        }
        removed
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.tracks.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Hand `chunk` to the track with the given id.
    pub fn route(
        &self,
        id: u32,
        chunk: &[u8],
        timestamp_ms: Option<i64>,
        sink: &mut dyn PacketSink,
    ) -> Result<ProcessStatus> {
        let track = self.get(id).ok_or(Error::TrackNotFound(id))?;
        Ok(track.process(chunk, timestamp_ms, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackConfig;
    use crate::packetizer::{Packet, PcmPacketizer};

    fn pcm() -> Box<dyn Packetizer> {
        let config = TrackConfig::new(8000, 1).with_pcm_interleave(10);
        Box::new(PcmPacketizer::new(&config).unwrap())
    }

    #[test]
    fn add_and_get() {
        let registry = TrackRegistry::new();
        registry.add(1, pcm()).unwrap();
        assert!(registry.get(1).is_some());
        assert!(registry.get(2).is_none());
        assert_eq!(registry.get(1).unwrap().id(), 1);
    }

    #[test]
    fn duplicate_id_rejected() {
        let registry = TrackRegistry::new();
        registry.add(1, pcm()).unwrap();
        assert!(matches!(
            registry.add(1, pcm()),
            Err(Error::DuplicateTrack(1))
        ));
    }

    #[test]
    fn route_to_track() {
        let registry = TrackRegistry::new();
        registry.add(3, pcm()).unwrap();
        let mut sink: Vec<Packet> = Vec::new();
        let status = registry.route(3, &[0u8; 3200], None, &mut sink).unwrap();
        assert_eq!(status, ProcessStatus::NeedMoreData);
        // 16000 bytes/s at 10 packets/s.
        assert_eq!(sink.len(), 2);
        assert_eq!(registry.get(3).unwrap().packets_emitted(), 2);
    }

    #[test]
    fn route_unknown_track() {
        let registry = TrackRegistry::new();
        let mut sink: Vec<Packet> = Vec::new();
        assert!(matches!(
            registry.route(9, &[], None, &mut sink),
            Err(Error::TrackNotFound(9))
        ));
    }

    #[test]
    fn remove_and_ids() {
        let registry = TrackRegistry::new();
        registry.add(5, pcm()).unwrap();
        registry.add(2, pcm()).unwrap();
        assert_eq!(registry.ids(), vec![2, 5]);
        assert!(registry.remove(5).is_some());
        assert!(registry.remove(5).is_none());
        assert_eq!(registry.ids(), vec![2]);
    }

    #[test]
    fn registry_shared_across_threads() {
        let registry = TrackRegistry::new();
        registry.add(1, pcm()).unwrap();
        let clone = registry.clone();
        let handle = std::thread::spawn(move || {
            let mut sink: Vec<Packet> = Vec::new();
            clone.route(1, &[0u8; 1600], None, &mut sink).unwrap();
            sink.len()
        });
        assert_eq!(handle.join().unwrap(), 1);
        assert_eq!(registry.get(1).unwrap().header().codec_id, "A_PCM/INT/LIT");
    }
}
