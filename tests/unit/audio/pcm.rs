use super::*;

#[test]
fn duration_comes_from_frame_count() {
    let pcm = AudioPcm::silence(MIX_SAMPLE_RATE, 2, 48_000 * 5);
    assert_eq!(pcm.frames(), 240_000);
    assert_eq!(pcm.duration_secs(), 5.0);
    assert_eq!(pcm.duration(), Duration::from_secs(5));
}

#[test]
fn new_rejects_misaligned_buffers() {
    assert!(AudioPcm::new(48_000, 2, vec![0.0; 3]).is_err());
    assert!(AudioPcm::new(0, 2, Vec::new()).is_err());
    assert!(AudioPcm::new(48_000, 1, vec![0.0; 3]).is_ok());
}

#[test]
fn f32le_file_round_trips() {
    let dir = std::env::temp_dir().join(format!("storyreel_pcm_{}", std::process::id()));
    let path = dir.join("mix.f32le");
    let samples = [0.0f32, -0.5, 0.25, 1.0];
    write_f32le_file(&samples, &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 16);
    assert_eq!(f32le_from_bytes(&bytes).unwrap(), samples.to_vec());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn misaligned_bytes_are_rejected() {
    assert!(f32le_from_bytes(&[0, 0, 0]).is_err());
}
