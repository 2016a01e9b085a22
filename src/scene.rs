//! Scenes: a camera plus an ordered object list, and the two ray-traced
//! flavours that render them.
//!
//! - [`Scene`] owns the camera, the objects and the animation clock
//! - [`RayScene`] renders on the CPU into a [`Framebuffer`](crate::Framebuffer)
//!   and mirrors it into the `"u_texture"` texture
//! - [`GpuRayScene`] marshals the objects every frame, dispatches a
//!   [`ComputeBackend`] and reads the result into the texture bound at
//!   [`OUTPUT_IMAGE_UNIT`]
//!
//! Object order matters: it is the hit-test order on the CPU and the slot
//! order of every GPU array.

use crate::camera::Camera;
use crate::compute::{ComputeBackend, OUTPUT_IMAGE_UNIT, RayTracerGpu};
use crate::config::RenderConfig;
use crate::error::{Result, TraceError};
use crate::hit::Hittable;
use crate::object::{SceneObject, Transform};
use crate::raytracer::{FrameStats, RayTracer};
use crate::texture::{ImageAccess, ImageData, Texture, Textures};
use glam::Vec3;

/// Name of the texture that receives the rendered image.
pub const OUTPUT_TEXTURE: &str = "u_texture";

/// Clock step per frame.
const TIME_STEP: f32 = 0.01;
/// Degrees added to an animated object's rotation per frame.
const SPIN_PER_FRAME: Vec3 = Vec3::new(0.8, 0.6, 0.4);
/// Amplitude of the per-frame sideways drift.
const DRIFT: f32 = 0.01;

/// A camera and the objects it looks at.
#[derive(Clone, Debug)]
pub struct Scene {
    pub camera: Camera,
    pub objects: Vec<SceneObject>,
    time: f32,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            objects: Vec::new(),
            time: 0.0,
        }
    }

    /// Two cubes either side of the origin, seen from `z = 6`.
    pub fn demo(aspect: f32) -> Self {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO, Vec3::Y, 45.0, aspect, 0.1, 100.0);
        let spin = Vec3::new(0.0, 45.0, 0.0);
        Self::new(camera)
            .with_object(
                SceneObject::cube("Cube1").with_transform(Transform::from_position(Vec3::new(-2.0, 0.0, 0.0)).rotation(spin)),
            )
            .with_object(
                SceneObject::cube("Cube2").with_transform(Transform::from_position(Vec3::new(2.0, 0.0, 0.0)).rotation(spin)),
            )
    }

    pub fn with_object(mut self, object: SceneObject) -> Self {
        self.add_object(object);
        self
    }

    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.name == name)
    }

    /// Seconds of animation elapsed, in clock steps of 0.01.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Step the animation clock and move every animated object.
    pub fn advance(&mut self) {
        self.time += TIME_STEP;
        let drift = self.time.sin() * DRIFT;
        for object in self.objects.iter_mut().filter(|o| o.animated) {
            object.transform.rotation += SPIN_PER_FRAME;
            object.transform.position.x += drift;
        }
    }

    /// Names of every object under screen point `(u, v)`, in object order.
    pub fn pick(&self, u: f32, v: f32) -> Result<Vec<&str>> {
        let ray = self.camera.raycast(u, v)?;
        let mut picked = Vec::new();
        for object in &self.objects {
            if object.check_hit(ray.origin(), ray.direction())? {
                log::info!("Picked object '{}' at ({u:.3}, {v:.3})", object.name);
                picked.push(object.name.as_str());
            }
        }
        Ok(picked)
    }

    /// Update the camera aspect. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.camera.aspect = width as f32 / height as f32;
        }
    }
}

fn apply_config(scene: &mut Scene, config: &RenderConfig) {
    scene.camera.set_sky_colors(config.sky_top, config.sky_bottom);
    scene.resize(config.width, config.height);
}

/// A scene rendered by the CPU [`RayTracer`].
pub struct RayScene {
    scene: Scene,
    config: RenderConfig,
    tracer: RayTracer,
    textures: Textures,
}

impl RayScene {
    /// Applies the configured sky colors and aspect to the camera and
    /// registers an RGB8 [`OUTPUT_TEXTURE`] of the configured size.
    pub fn new(mut scene: Scene, config: RenderConfig) -> Result<Self> {
        apply_config(&mut scene, &config);
        let tracer = RayTracer::new(&config)?;
        let mut textures = Textures::new();
        textures.insert(Texture::new(OUTPUT_TEXTURE, tracer.framebuffer().to_image_data()));
        Ok(Self {
            scene,
            config,
            tracer,
            textures,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn tracer(&self) -> &RayTracer {
        &self.tracer
    }

    pub fn textures(&self) -> &Textures {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut Textures {
        &mut self.textures
    }

    /// Render the current state and copy the framebuffer into [`OUTPUT_TEXTURE`].
    pub fn start(&mut self) -> Result<FrameStats> {
        log::info!(
            "Ray tracing {} objects at {}x{}",
            self.scene.objects.len(),
            self.tracer.width(),
            self.tracer.height()
        );
        let stats = self.tracer.render_frame(&self.scene.camera, &self.scene.objects)?;
        self.textures
            .update(OUTPUT_TEXTURE, self.tracer.framebuffer().to_image_data())?;
        Ok(stats)
    }

    /// Advance the animation one frame, then render.
    pub fn render(&mut self) -> Result<FrameStats> {
        self.scene.advance();
        self.start()
    }

    /// Rebuild the framebuffer at the new size and render again.
    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<FrameStats> {
        let config = self.config.size(width, height);
        self.tracer = RayTracer::new(&config)?;
        self.config = config;
        self.scene.resize(width, height);
        self.start()
    }
}

/// A scene rendered by a compute backend.
pub struct GpuRayScene<B> {
    scene: Scene,
    tracer: RayTracerGpu<B>,
    textures: Textures,
}

impl<B: ComputeBackend> GpuRayScene<B> {
    /// Registers an RGBA32F [`OUTPUT_TEXTURE`] bound write-only at
    /// [`OUTPUT_IMAGE_UNIT`] and uploads the first frame.
    pub fn new(mut scene: Scene, backend: B, config: RenderConfig) -> Result<Self> {
        apply_config(&mut scene, &config);
        let tracer = RayTracerGpu::new(backend, config.width, config.height)?;

        let mut textures = Textures::new();
        textures.insert(Texture::new(
            OUTPUT_TEXTURE,
            ImageData::rgba32f(config.width, config.height),
        ));
        textures.bind_to_image(OUTPUT_TEXTURE, OUTPUT_IMAGE_UNIT, ImageAccess::WriteOnly)?;

        let mut gpu_scene = Self {
            scene,
            tracer,
            textures,
        };
        gpu_scene.start()?;
        Ok(gpu_scene)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn tracer(&self) -> &RayTracerGpu<B> {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut RayTracerGpu<B> {
        &mut self.tracer
    }

    pub fn textures(&self) -> &Textures {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut Textures {
        &mut self.textures
    }

    /// Marshal and upload the current object state.
    pub fn start(&mut self) -> Result<()> {
        log::info!("Starting GPU ray tracing with {} objects", self.scene.objects.len());
        self.tracer.upload_frame(&self.scene.objects)
    }

    /// Re-marshal every object, dispatch without moving anything, then copy
    /// the output into the texture bound at [`OUTPUT_IMAGE_UNIT`].
    pub fn run(&mut self) -> Result<[u32; 3]> {
        let target = self.output_target()?;
        let groups = self.tracer.render(&self.scene.camera, &self.scene.objects)?;
        let frame = self.tracer.read_output()?;
        self.textures.update(&target, ImageData::Rgba32F(frame))?;
        Ok(groups)
    }

    fn output_target(&self) -> Result<String> {
        let binding = self
            .textures
            .image_binding(OUTPUT_IMAGE_UNIT)
            .ok_or_else(|| TraceError::Gpu(format!("no texture bound at image unit {OUTPUT_IMAGE_UNIT}")))?;
        if !binding.access.allows_write() {
            return Err(TraceError::Gpu(format!(
                "texture '{}' at image unit {OUTPUT_IMAGE_UNIT} is not writable",
                binding.name
            )));
        }
        Ok(binding.name.clone())
    }

    /// Advance the animation, then [`run`](Self::run).
    pub fn render(&mut self) -> Result<[u32; 3]> {
        self.scene.advance();
        self.run()
    }

    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.tracer.resize(width, height)?;
        self.scene.resize(width, height);
        self.textures
            .update(OUTPUT_TEXTURE, ImageData::rgba32f(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::tests::RecordingBackend;
    use crate::compute::{BINDING_MODELS, dispatch_groups};

    #[test]
    fn demo_scene_layout() {
        let scene = Scene::demo(800.0 / 600.0);
        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.objects[0].transform.position, Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(scene.objects[1].transform.rotation, Vec3::new(0.0, 45.0, 0.0));
        assert_eq!(scene.camera.fov, 45.0);
    }

    #[test]
    fn advance_spins_and_drifts_animated_objects_only() {
        let mut scene = Scene::demo(1.0);
        scene.object_mut("Cube2").unwrap().animated = false;
        scene.advance();

        assert!((scene.time() - 0.01).abs() < 1e-7);
        let cube1 = scene.object("Cube1").unwrap();
        assert!((cube1.transform.rotation - Vec3::new(0.8, 45.6, 0.4)).length() < 1e-5);
        let expected_x = -2.0 + 0.01f32.sin() * 0.01;
        assert!((cube1.transform.position.x - expected_x).abs() < 1e-7);

        let cube2 = scene.object("Cube2").unwrap();
        assert_eq!(cube2.transform.rotation, Vec3::new(0.0, 45.0, 0.0));
        assert_eq!(cube2.transform.position.x, 2.0);
    }

    #[test]
    fn pick_returns_every_object_hit_in_order() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO, Vec3::Y, 45.0, 1.0, 0.1, 100.0);
        let scene = Scene::new(camera)
            .with_object(SceneObject::cube("front").with_transform(Transform::from_position(Vec3::Z)))
            .with_object(SceneObject::cube("back"))
            .with_object(SceneObject::cube("ghost").hittable(false));
        assert_eq!(scene.pick(0.5, 0.5).unwrap(), vec!["front", "back"]);
        assert!(scene.pick(0.0, 1.0).unwrap().is_empty());
    }

    #[test]
    fn pick_demo_cubes_left_and_right() {
        let scene = Scene::demo(800.0 / 600.0);
        assert_eq!(scene.pick(0.5, 0.5).unwrap(), Vec::<&str>::new());
        // Cube1 sits at x = -2, left of center.
        let left = 0.5 - 2.0 / (6.0 * (22.5f32).to_radians().tan() * 800.0 / 600.0) / 2.0;
        assert_eq!(scene.pick(left, 0.5).unwrap(), vec!["Cube1"]);
        assert_eq!(scene.pick(1.0 - left, 0.5).unwrap(), vec!["Cube2"]);
    }

    #[test]
    fn resize_sets_aspect_and_ignores_zero() {
        let mut scene = Scene::demo(1.0);
        scene.resize(1920, 1080);
        assert!((scene.camera.aspect - 16.0 / 9.0).abs() < 1e-6);
        scene.resize(0, 1080);
        assert!((scene.camera.aspect - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn ray_scene_start_fills_output_texture() {
        let config = RenderConfig::new().size(16, 12);
        let mut ray_scene = RayScene::new(Scene::demo(1.0), config).unwrap();
        assert!((ray_scene.scene().camera.aspect - 16.0 / 12.0).abs() < 1e-6);

        let stats = ray_scene.start().unwrap();
        assert_eq!(stats.pixels(), 16 * 12);
        assert!(stats.hits > 0 && stats.misses > 0);

        let texture = ray_scene.textures().get(OUTPUT_TEXTURE).unwrap();
        assert_eq!(texture.data, ray_scene.tracer().framebuffer().to_image_data());
    }

    #[test]
    fn ray_scene_render_advances_clock() {
        let mut ray_scene = RayScene::new(Scene::demo(1.0), RenderConfig::new().size(4, 4)).unwrap();
        ray_scene.render().unwrap();
        ray_scene.render().unwrap();
        assert!((ray_scene.scene().time() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn ray_scene_on_resize_rebuilds_framebuffer() {
        let mut ray_scene = RayScene::new(Scene::demo(1.0), RenderConfig::new().size(8, 8)).unwrap();
        let stats = ray_scene.on_resize(10, 5).unwrap();
        assert_eq!(stats.pixels(), 50);
        assert_eq!(ray_scene.tracer().width(), 10);
        assert_eq!(ray_scene.textures().get(OUTPUT_TEXTURE).unwrap().height(), 5);
        assert_eq!(ray_scene.scene().camera.aspect, 2.0);
        assert!(ray_scene.on_resize(0, 5).is_err());
    }

    #[test]
    fn ray_scene_start_fails_when_output_texture_missing() {
        let mut ray_scene = RayScene::new(Scene::demo(1.0), RenderConfig::new().size(2, 2)).unwrap();
        *ray_scene.textures_mut() = Textures::new();
        assert_eq!(
            ray_scene.start(),
            Err(TraceError::TextureNotFound {
                name: OUTPUT_TEXTURE.into()
            })
        );
    }

    #[test]
    fn gpu_scene_binds_output_and_uploads_on_creation() {
        let config = RenderConfig::new().size(40, 20);
        let gpu_scene = GpuRayScene::new(Scene::demo(1.0), RecordingBackend::default(), config).unwrap();

        let binding = gpu_scene.textures().image_binding(OUTPUT_IMAGE_UNIT).unwrap();
        assert_eq!(binding.name, OUTPUT_TEXTURE);
        assert_eq!(binding.access, ImageAccess::WriteOnly);

        let backend = gpu_scene.tracer().backend();
        assert_eq!(backend.output_size, Some((40, 20)));
        assert_eq!(backend.storage[BINDING_MODELS as usize].len(), 2 * 64);
        assert!(backend.dispatches.is_empty());
    }

    #[test]
    fn gpu_scene_render_remarshals_moved_objects() {
        let mut gpu_scene =
            GpuRayScene::new(Scene::demo(1.0), RecordingBackend::default(), RenderConfig::new().size(33, 17)).unwrap();
        let before = gpu_scene.tracer().frame_data().models()[0];

        let groups = gpu_scene.render().unwrap();
        assert_eq!(groups, dispatch_groups(33, 17));

        let after = gpu_scene.tracer().frame_data().models()[0];
        assert_ne!(before, after);
        let expected = gpu_scene.scene().objects[0].model_matrix().to_cols_array();
        assert_eq!(after, expected);
    }

    #[test]
    fn gpu_scene_run_reads_frame_into_output_texture() {
        let config = RenderConfig::new().size(4, 4);
        let mut gpu_scene = GpuRayScene::new(Scene::demo(1.0), RecordingBackend::default(), config).unwrap();
        gpu_scene.render().unwrap();
        gpu_scene.render().unwrap();

        let texture = gpu_scene.textures().get(OUTPUT_TEXTURE).unwrap();
        let ImageData::Rgba32F(frame) = &texture.data else {
            panic!("output texture should stay RGBA32F");
        };
        assert_eq!(frame.dimensions(), (4, 4));
        assert!(frame.pixels().all(|p| p.0 == [2.0, 0.0, 0.0, 1.0]));
        assert_eq!(*frame, gpu_scene.tracer().read_output().unwrap());
    }

    #[test]
    fn gpu_scene_run_rejects_read_only_output_binding() {
        let config = RenderConfig::new().size(4, 4);
        let mut gpu_scene = GpuRayScene::new(Scene::demo(1.0), RecordingBackend::default(), config).unwrap();
        gpu_scene
            .textures_mut()
            .bind_to_image(OUTPUT_TEXTURE, OUTPUT_IMAGE_UNIT, ImageAccess::ReadOnly)
            .unwrap();
        assert!(matches!(gpu_scene.run(), Err(TraceError::Gpu(_))));
        assert!(gpu_scene.tracer().backend().dispatches.is_empty());
    }

    #[test]
    fn gpu_scene_resize_updates_backend_and_texture() {
        let mut gpu_scene =
            GpuRayScene::new(Scene::demo(1.0), RecordingBackend::default(), RenderConfig::new().size(8, 8)).unwrap();
        gpu_scene.on_resize(64, 32).unwrap();
        assert_eq!(gpu_scene.tracer().backend().output_size, Some((64, 32)));
        assert_eq!(gpu_scene.textures().get(OUTPUT_TEXTURE).unwrap().width(), 64);
        assert_eq!(gpu_scene.scene().camera.aspect, 2.0);
    }
}
