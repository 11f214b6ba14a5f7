use crate::assets::{AssetProvider, ColorSpace, TextureOptions};
use crate::config::ViewerConfig;
use crate::viewer::LoadEvent;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::JoinHandle;

/// What the worker fetches, in order.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub cubemap_faces: [String; 6],
    pub baked_texture: String,
    pub model: String,
}

impl LoadRequest {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            cubemap_faces: config.cubemap_faces.clone(),
            baked_texture: config.baked_texture_path.clone(),
            model: config.model_path.clone(),
        }
    }
}

/// Background asset load. Events arrive environment first, then the baked
/// texture, then the model, so composition always sees the texture result.
pub struct PendingLoad {
    receiver: Receiver<LoadEvent>,
    worker: Option<JoinHandle<()>>,
    finished: bool,
}

impl PendingLoad {
    pub fn spawn(mut provider: Box<dyn AssetProvider + Send>, request: LoadRequest) -> Self {
        let (tx, rx) = mpsc::channel();
        let worker = std::thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || {
                let srgb = TextureOptions {
                    color_space: ColorSpace::Srgb,
                    flip_y: true,
                };
                let events = [
                    LoadEvent::Environment(provider.load_cubemap(&request.cubemap_faces, srgb)),
                    LoadEvent::BakedTexture(provider.load_texture(
                        &request.baked_texture,
                        TextureOptions {
                            flip_y: false,
                            ..srgb
                        },
                    )),
                ];
                for event in events {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                let _ = tx.send(LoadEvent::Model(provider.load_model(&request.model)));
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(err) => {
                log::error!("Could not start asset loader thread: {}", err);
                None
            }
        };
        let finished = worker.is_none();
        Self {
            receiver: rx,
            worker,
            finished,
        }
    }

    /// Drains whatever has arrived without blocking.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finish();
                    break;
                }
            }
        }
        events
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Asset loader thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetError, ModelAsset, TextureHandle};
    use crate::scene::test_support::model_with_meshes;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    struct FakeProvider {
        texture_options: Arc<Mutex<Vec<TextureOptions>>>,
        fail_model: bool,
    }

    impl AssetProvider for FakeProvider {
        fn load_model(&mut self, path: &str) -> Result<ModelAsset, AssetError> {
            if self.fail_model {
                return Err(AssetError::InvalidGltf {
                    path: path.to_string(),
                    reason: "missing".to_string(),
                });
            }
            Ok(model_with_meshes(&["Cube"]))
        }

        fn load_cubemap(
            &mut self,
            _faces: &[String; 6],
            options: TextureOptions,
        ) -> Result<TextureHandle, AssetError> {
            self.texture_options.lock().unwrap().push(options);
            Ok(TextureHandle::cubemap_for_tests(1, 8))
        }

        fn load_texture(
            &mut self,
            _path: &str,
            options: TextureOptions,
        ) -> Result<TextureHandle, AssetError> {
            self.texture_options.lock().unwrap().push(options);
            Ok(TextureHandle::cubemap_for_tests(2, 8))
        }
    }

    fn drain(load: &mut PendingLoad) -> Vec<LoadEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while !load.is_finished() && Instant::now() < deadline {
            events.extend(load.poll());
            std::thread::sleep(Duration::from_millis(1));
        }
        events
    }

    fn spawn(fail_model: bool) -> (PendingLoad, Arc<Mutex<Vec<TextureOptions>>>) {
        let options = Arc::new(Mutex::new(Vec::new()));
        let provider = FakeProvider {
            texture_options: Arc::clone(&options),
            fail_model,
        };
        let load = PendingLoad::spawn(
            Box::new(provider),
            LoadRequest::from_config(&ViewerConfig::default()),
        );
        (load, options)
    }

    #[test]
    fn events_arrive_in_load_order() {
        let (mut load, options) = spawn(false);
        let events = drain(&mut load);
        assert!(load.is_finished());
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], LoadEvent::Environment(Ok(_))));
        assert!(matches!(events[1], LoadEvent::BakedTexture(Ok(_))));
        assert!(matches!(events[2], LoadEvent::Model(Ok(_))));

        let options = options.lock().unwrap();
        assert_eq!(options.len(), 2);
        assert!(options.iter().all(|o| o.color_space == ColorSpace::Srgb));
        assert!(options[0].flip_y);
        assert!(!options[1].flip_y);
    }

    #[test]
    fn model_failure_is_delivered_not_dropped() {
        let (mut load, _) = spawn(true);
        let events = drain(&mut load);
        assert!(matches!(events.last(), Some(LoadEvent::Model(Err(_)))));
        assert!(load.poll().is_empty());
    }
}
