use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use super::draw::{DepthState, DrawCommand, Primitive};
use super::epilogue;
use super::hooks::{HookList, TeardownGuard};
use crate::effect::{Effect, EffectRegistry, Registration, RenderProps};
use crate::error::{ConfigError, ErrorReporter};
use crate::shader::{
    AttributeAllocator, BindingTable, GlslType, ShaderProgram, ShaderStage, UniformAllocator,
    UniformBinding, UniformValue,
};
use crate::timeline::{EffectInstance, TimelineConfig};

/// An instance paired with the effect that will register it.
struct Queued {
    instance: EffectInstance,
    effect: Arc<dyn Effect>,
}

/// Turns a timeline into a [`DrawCommand`].
///
/// Construction resolves every effect id up front, so configuration errors
/// surface before anything is awaited. [`CommandBuilder::build`] then owns
/// both shader programs for the lifetime of the build and hands them to one
/// effect at a time.
pub struct CommandBuilder {
    queue: VecDeque<Queued>,
}

impl CommandBuilder {
    pub fn new(config: &TimelineConfig, registry: &EffectRegistry) -> Result<Self, ConfigError> {
        config.validate()?;
        let queue = config
            .instances()
            .map(|instance| {
                Ok(Queued {
                    instance: instance.clone(),
                    effect: registry.get(&instance.effect_id)?,
                })
            })
            .collect::<Result<VecDeque<_>, ConfigError>>()?;
        Ok(Self { queue })
    }

    /// Instances still to be registered.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    fn next(&mut self) -> Option<Queued> {
        self.queue.pop_front()
    }

    /// Register every queued effect in track order and assemble the command.
    ///
    /// An effect whose registration fails is reported to `errors` and leaves a
    /// comment in place of its code; the build itself always completes.
    pub fn build<'a>(
        mut self,
        props: &'a RenderProps<'a>,
        errors: &'a ErrorReporter,
    ) -> impl Future<Output = DrawCommand> + 'a {
        async move {
            let mut vertex = ShaderProgram::new(ShaderStage::Vertex);
            let mut fragment = ShaderProgram::new(ShaderStage::Fragment);
            let mut uniforms = BindingTable::new();
            let mut attributes = BindingTable::new();
            // Armed until the command is assembled, so a build dropped
            // mid-flight still tears down what its effects registered.
            let mut hooks = TeardownGuard::new(HookList::default());

            let shared = default_uniforms(props);
            shared.compile(&mut vertex, Some(&mut uniforms));
            shared.compile(&mut fragment, None);
            default_attributes(props).compile(&mut vertex, Some(&mut attributes));
            epilogue::prologue(props.config, &mut vertex, &mut fragment);

            let mut namespace = 0;
            while let Some(Queued { instance, effect }) = self.next() {
                let guard = guard(&instance);
                vertex.add_main(&guard);
                fragment.add_main(&guard);
                let vertex_mark = vertex.checkpoint();
                let fragment_mark = fragment.checkpoint();

                let mut effect_uniforms = UniformAllocator::new(namespace);
                let mut effect_attributes = AttributeAllocator::new(namespace);
                let mut effect_hooks = TeardownGuard::new(HookList::default());
                let result = effect
                    .register(Registration {
                        instance: &instance,
                        props,
                        uniforms: &mut effect_uniforms,
                        vertex: &mut vertex,
                        fragment: &mut fragment,
                        attributes: &mut effect_attributes,
                        hooks: effect_hooks.get_mut(),
                        namespace,
                    })
                    .await;

                match result {
                    Ok(()) => {
                        vertex.add_main("}");
                        fragment.add_main("}");
                        effect_uniforms.compile(&mut vertex, Some(&mut uniforms));
                        effect_uniforms.compile(&mut fragment, None);
                        effect_attributes.compile(&mut vertex, Some(&mut attributes));
                        hooks.get_mut().extend(effect_hooks.into_inner());
                    }
                    Err(e) => {
                        vertex.rollback(vertex_mark);
                        fragment.rollback(fragment_mark);
                        let marker = format!("// {} failed to register\n}}", instance.effect_id);
                        vertex.add_main(&marker);
                        fragment.add_main(&marker);
                        effect_hooks.into_inner().teardown();
                        errors.report(e);
                    }
                }
                namespace += 1;
            }

            let blend = epilogue::epilogue(props.config, &mut vertex, &mut fragment);
            log::info!(
                "Built draw command: {} effects, {} uniforms, {} particles",
                namespace,
                uniforms.len(),
                props.config.particle_count()
            );

            DrawCommand {
                primitive: Primitive::Points,
                count: props.config.particle_count(),
                attributes,
                uniforms,
                vert: vertex.compile(),
                frag: fragment.compile(),
                depth: DepthState { enable: false },
                blend,
                hooks: hooks.into_inner(),
            }
        }
    }
}

/// Validate and resolve synchronously, then hand back the build to await.
pub fn build_command<'a>(
    props: &'a RenderProps<'a>,
    registry: &EffectRegistry,
    errors: &'a ErrorReporter,
) -> Result<impl Future<Output = DrawCommand> + use<'a>, ConfigError> {
    let builder = CommandBuilder::new(props.config, registry)?;
    Ok(builder.build(props, errors))
}

/// `if (begin <= globalTime && globalTime <= end) {`
pub fn guard(instance: &EffectInstance) -> String {
    format!(
        "if ({} <= globalTime && globalTime <= {}) {{",
        instance.time_begin, instance.time_end
    )
}

fn default_uniforms(props: &RenderProps<'_>) -> UniformAllocator {
    let mut shared = UniformAllocator::shared();
    shared.add(
        "globalTime",
        GlslType::Float,
        UniformBinding::per_frame(|f| UniformValue::Float(f.time as f32)),
    );
    shared.add(
        "viewport",
        GlslType::Vec2,
        UniformBinding::per_frame(|f| UniformValue::Vec2([f.width as f32, f.height as f32])),
    );
    shared.add("particleSize", GlslType::Float, props.config.particle_size);
    shared.add(
        "invScreenAspectRatio",
        GlslType::Float,
        UniformBinding::per_frame(|f| UniformValue::Float(f.height as f32 / f.width.max(1) as f32)),
    );
    shared.add(
        "background_color",
        GlslType::Vec3,
        UniformValue::Vec3(props.config.background_color),
    );
    shared
}

fn default_attributes(props: &RenderProps<'_>) -> AttributeAllocator {
    let mut shared = AttributeAllocator::shared();
    shared.add("texcoord", GlslType::Vec2, props.state.texcoord());
    shared.add("rgb", GlslType::Vec3, props.state.rgb());
    shared.add("hsv", GlslType::Vec3, props.state.hsv());
    shared
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rustc_hash::FxHashSet;
    use serde_json::json;

    use super::*;
    use crate::clock::FrameContext;
    use crate::effect::RegisterFuture;
    use crate::effect::builtin::MemoryImageProvider;
    use crate::error::{EffectError, error_channel};
    use crate::params::ParamDef;
    use crate::particle::ParticleGrid;
    use crate::timeline::Track;

    /// Writes half its code, then fails.
    struct Failing;

    impl Effect for Failing {
        fn id(&self) -> &'static str {
            "Failing"
        }

        fn display_name(&self) -> &'static str {
            "Failing"
        }

        fn params(&self) -> Vec<ParamDef> {
            Vec::new()
        }

        fn register<'a>(&'a self, mut reg: Registration<'a>) -> RegisterFuture<'a> {
            reg.vertex.add_main("position.x += 1.0; {");
            reg.fragment.add_global("float broken(");
            reg.uniforms.add("lost", GlslType::Float, 1.0_f32);
            reg.hooks.on_teardown(|| TEARDOWNS.with(|t| t.set(t.get() + 1)));
            Box::pin(std::future::ready(Err(EffectError::new("Failing", "boom"))))
        }
    }

    thread_local! {
        static TEARDOWNS: Cell<usize> = const { Cell::new(0) };
    }

    /// Yields to the executor before registering, like an effect loading data.
    struct Slow {
        polls: Arc<AtomicUsize>,
    }

    impl Effect for Slow {
        fn id(&self) -> &'static str {
            "Slow"
        }

        fn display_name(&self) -> &'static str {
            "Slow"
        }

        fn params(&self) -> Vec<ParamDef> {
            Vec::new()
        }

        fn register<'a>(&'a self, mut reg: Registration<'a>) -> RegisterFuture<'a> {
            let polls = self.polls.clone();
            Box::pin(async move {
                YieldOnce(false).await;
                polls.fetch_add(1, Ordering::SeqCst);
                reg.vertex.add_main("position.y += 0.0;");
                Ok(())
            })
        }
    }

    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<()> {
            if self.0 {
                std::task::Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                std::task::Poll::Pending
            }
        }
    }

    fn registry() -> EffectRegistry {
        let mut registry =
            EffectRegistry::with_builtins(Arc::new(MemoryImageProvider::default())).unwrap();
        registry.register(Failing).unwrap();
        registry
    }

    fn config(instances: Vec<EffectInstance>, w: u32, h: u32) -> TimelineConfig {
        TimelineConfig {
            tracks: vec![Track::new(instances)],
            particle_grid_width: w,
            particle_grid_height: h,
            ..TimelineConfig::default()
        }
    }

    fn build(config: &TimelineConfig, registry: &EffectRegistry) -> (DrawCommand, Vec<EffectError>) {
        let grid = ParticleGrid::gradient(config.particle_grid_width, config.particle_grid_height)
            .unwrap();
        let props = RenderProps {
            config,
            state: &grid,
            clock: FrameContext {
                time: 0.0,
                delta: 0.0,
                width: 640,
                height: 480,
            },
        };
        let (reporter, inbox) = error_channel();
        let command = pollster::block_on(build_command(&props, registry, &reporter).unwrap());
        (command, inbox.drain())
    }

    fn braces_balanced(source: &str) -> bool {
        let mut depth = 0i32;
        for c in source.chars() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
            if depth < 0 {
                return false;
            }
        }
        depth == 0
    }

    #[test]
    fn wave_on_a_four_by_four_grid() {
        let cfg = config(vec![EffectInstance::new("Wave", 0.0, 10000.0)], 4, 4);
        let (command, errors) = build(&cfg, &registry());
        assert_eq!(command.count, 16);
        assert_eq!(command.primitive, Primitive::Points);
        assert!(!command.depth.enable);
        let guard = "if (0 <= globalTime && globalTime <= 10000)";
        assert_eq!(command.vert.matches(guard).count(), 1);
        assert_eq!(command.frag.matches(guard).count(), 1);
        assert!(errors.is_empty());
    }

    #[test]
    fn sources_are_well_formed() {
        let cfg = TimelineConfig {
            tracks: vec![
                Track::new(vec![
                    EffectInstance::new("Wave", 0.0, 1000.0),
                    EffectInstance::new("Converge", 1000.0, 3000.0).with_repetitions(2),
                ]),
                Track::new(vec![
                    EffectInstance::new("Colorize", 500.0, 2500.0),
                    EffectInstance::new("HueDisplace", 0.0, 3000.0),
                    EffectInstance::new("Dummy", 0.0, 0.0),
                ]),
            ],
            ..TimelineConfig::default()
        };
        let (command, errors) = build(&cfg, &registry());
        assert!(errors.is_empty());
        for source in [&command.vert, &command.frag] {
            assert!(braces_balanced(source));
            assert_eq!(source.matches("<= globalTime &&").count(), 5);
            assert_eq!(source.matches("void main()").count(), 1);
        }
        assert_eq!(command.vert.matches("gl_PointSize =").count(), 1);
        assert_eq!(command.frag.matches("gl_FragColor =").count(), 1);
    }

    #[test]
    fn guards_follow_track_order() {
        let cfg = TimelineConfig {
            tracks: vec![
                Track::new(vec![EffectInstance::new("Dummy", 1.0, 2.0)]),
                Track::new(vec![EffectInstance::new("Dummy", 3.0, 4.0)]),
            ],
            ..TimelineConfig::default()
        };
        let (command, _) = build(&cfg, &registry());
        let first = command.vert.find("if (1 <= globalTime").unwrap();
        let second = command.vert.find("if (3 <= globalTime").unwrap();
        assert!(first < second);
    }

    #[test]
    fn uniform_names_are_distinct() {
        for n in 0..6_u32 {
            let instances = (0..n)
                .map(|i| EffectInstance::new("Wave", f64::from(i) * 100.0, 1000.0))
                .collect();
            let (command, _) = build(&config(instances, 8, 8), &registry());
            // Five shared uniforms plus four per wave.
            assert_eq!(command.uniforms.len(), 5 + 4 * n as usize);
            let declared: Vec<&str> = command
                .vert
                .lines()
                .filter(|l| l.starts_with("uniform "))
                .collect();
            let unique: FxHashSet<&str> = declared.iter().copied().collect();
            assert_eq!(declared.len(), unique.len());
            assert_eq!(declared.len(), command.uniforms.len());
        }
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let cfg = config(
            vec![
                EffectInstance::new("Wave", 0.0, 1000.0),
                EffectInstance::new("Colorize", 0.0, 1000.0).with_config(json!({"amount": 0.2})),
            ],
            10,
            10,
        );
        let registry = registry();
        let (a, _) = build(&cfg, &registry);
        let (b, _) = build(&cfg, &registry);
        assert_eq!(
            a.uniforms.keys().collect::<Vec<_>>(),
            b.uniforms.keys().collect::<Vec<_>>()
        );
        assert_eq!(a.vert, b.vert);
        assert_eq!(a.frag, b.frag);
        assert_eq!(a.describe(), b.describe());
    }

    #[test]
    fn failing_effect_leaves_the_rest_intact() {
        TEARDOWNS.with(|t| t.set(0));
        let cfg = config(
            vec![
                EffectInstance::new("Wave", 0.0, 1000.0),
                EffectInstance::new("Failing", 0.0, 1000.0),
                EffectInstance::new("Colorize", 0.0, 1000.0),
            ],
            4,
            4,
        );
        let registry = registry();
        let (command, errors) = build(&cfg, &registry);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].effect_id, "Failing");
        assert_eq!(TEARDOWNS.with(Cell::get), 1);
        assert!(command.hooks.is_empty());

        for source in [&command.vert, &command.frag] {
            assert!(braces_balanced(source));
            assert!(source.contains("// Failing failed to register"));
            assert!(!source.contains("broken("));
            assert_eq!(source.matches("<= globalTime &&").count(), 3);
        }
        assert!(!command.uniforms.contains_key("lost_1"));
        // Namespace ids keep counting past the failure.
        assert!(command.uniforms.contains_key("amplitude_0"));
        assert!(command.uniforms.contains_key("color_2"));

        let without = config(
            vec![
                EffectInstance::new("Wave", 0.0, 1000.0),
                EffectInstance::new("Colorize", 0.0, 1000.0),
            ],
            4,
            4,
        );
        let (clean, _) = build(&without, &registry);
        assert_eq!(
            command.vert.matches("wavePhase").count(),
            clean.vert.matches("wavePhase").count()
        );
    }

    #[test]
    fn unknown_effect_fails_before_building() {
        let cfg = config(vec![EffectInstance::new("Sparkle", 0.0, 1.0)], 4, 4);
        let grid = ParticleGrid::gradient(4, 4).unwrap();
        let props = RenderProps {
            config: &cfg,
            state: &grid,
            clock: FrameContext {
                time: 0.0,
                delta: 0.0,
                width: 1,
                height: 1,
            },
        };
        let (reporter, _inbox) = error_channel();
        let err = build_command(&props, &registry(), &reporter).err().unwrap();
        assert_eq!(err.to_string(), "No such effect: Sparkle");
    }

    #[test]
    fn inverted_window_is_rejected() {
        let cfg = config(vec![EffectInstance::new("Wave", 5.0, 1.0)], 4, 4);
        assert!(matches!(
            CommandBuilder::new(&cfg, &registry()).err(),
            Some(ConfigError::InvertedWindow { .. })
        ));
    }

    #[test]
    fn async_registrations_are_awaited_in_order() {
        let polls = Arc::new(AtomicUsize::new(0));
        let mut registry = registry();
        registry
            .register(Slow {
                polls: polls.clone(),
            })
            .unwrap();
        let cfg = config(
            vec![
                EffectInstance::new("Slow", 0.0, 1.0),
                EffectInstance::new("Wave", 0.0, 1.0),
                EffectInstance::new("Slow", 0.0, 1.0),
            ],
            2,
            2,
        );
        let (command, errors) = build(&cfg, &registry);
        assert!(errors.is_empty());
        assert_eq!(polls.load(Ordering::SeqCst), 2);
        let slow = command.vert.find("position.y += 0.0;").unwrap();
        let wave = command.vert.find("wavePhase").unwrap();
        assert!(slow < wave);
        assert!(command.vert.rfind("position.y += 0.0;").unwrap() > wave);
    }

    #[test]
    fn frame_hooks_travel_with_the_command() {
        struct Ticking(Arc<AtomicUsize>);

        impl Effect for Ticking {
            fn id(&self) -> &'static str {
                "Ticking"
            }

            fn display_name(&self) -> &'static str {
                "Ticking"
            }

            fn params(&self) -> Vec<ParamDef> {
                Vec::new()
            }

            fn register<'a>(&'a self, mut reg: Registration<'a>) -> RegisterFuture<'a> {
                let ticks = self.0.clone();
                reg.hooks.on_frame(move |_| {
                    ticks.fetch_add(1, Ordering::SeqCst);
                });
                Box::pin(std::future::ready(Ok(())))
            }
        }

        let ticks = Arc::new(AtomicUsize::new(0));
        let mut registry = registry();
        registry.register(Ticking(ticks.clone())).unwrap();
        let cfg = config(vec![EffectInstance::new("Ticking", 0.0, 1.0)], 2, 2);
        let (mut command, _) = build(&cfg, &registry);
        let frame = FrameContext {
            time: 0.0,
            delta: 16.0,
            width: 1,
            height: 1,
        };
        command.run_frame_hooks(&frame);
        command.run_frame_hooks(&frame);
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn per_frame_uniforms_resolve_from_the_frame() {
        let cfg = config(Vec::new(), 2, 2);
        let (command, _) = build(&cfg, &registry());
        let values = command.resolve_uniforms(&FrameContext {
            time: 250.0,
            delta: 16.0,
            width: 200,
            height: 100,
        });
        assert_eq!(values["globalTime"], UniformValue::Float(250.0));
        assert_eq!(values["viewport"], UniformValue::Vec2([200.0, 100.0]));
        assert_eq!(values["invScreenAspectRatio"], UniformValue::Float(0.5));
        assert_eq!(values["particleSize"], UniformValue::Float(8.0));
        assert_eq!(command.attributes.len(), 3);
    }
}
