use crate::config::{
    FRET_Y, FRETBOARD_LENGTH, HIT_EFFECT_PARTICLES, HIT_MARKER_IDLE_COLOR, LANE_COUNT, NUM_FRETS,
    PARTICLE_FIRE_END_COLOR, PARTICLE_FIRE_START_COLOR, PARTICLE_LIFE_DECAY,
};
use crate::game::note::Lane;
use cgmath::Vector3;
use rand::Rng;

pub type Rgb = [f32; 3];

pub fn rgb(hex: u32) -> Rgb {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

fn lerp_rgb(a: Rgb, b: Rgb, t: f32) -> Rgb {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[derive(Clone, Debug)]
pub struct Particle {
    pub position: Vector3<f32>,
    pub color: Rgb,
    pub size: f32,
}

/// One hit's worth of sparks. They share a life value, which doubles as opacity.
#[derive(Clone, Debug)]
pub struct ParticleBurst {
    pub particles: Vec<Particle>,
    pub life: f32,
}

impl ParticleBurst {
    #[allow(dead_code)]
    pub fn opacity(&self) -> f32 {
        self.life.max(0.0)
    }
}

#[derive(Debug)]
pub struct Effects {
    bursts: Vec<ParticleBurst>,
    fret_z: [f32; NUM_FRETS],
    marker_colors: [u32; LANE_COUNT],
}

impl Effects {
    pub fn new() -> Self {
        let spacing = FRETBOARD_LENGTH / (NUM_FRETS - 1) as f32;
        let mut fret_z = [0.0; NUM_FRETS];
        for (i, z) in fret_z.iter_mut().enumerate() {
            *z = -FRETBOARD_LENGTH / 2.0 + spacing * i as f32;
        }
        Self {
            bursts: Vec::new(),
            fret_z,
            marker_colors: [HIT_MARKER_IDLE_COLOR; LANE_COUNT],
        }
    }

    pub fn create_hit_effect<R: Rng>(&mut self, position: Vector3<f32>, color: u32, rng: &mut R) {
        let tint = rgb(color);
        let fire_start = rgb(PARTICLE_FIRE_START_COLOR);
        let fire_end = rgb(PARTICLE_FIRE_END_COLOR);

        let particles = (0..HIT_EFFECT_PARTICLES)
            .map(|_| {
                let fire = lerp_rgb(fire_start, fire_end, rng.random::<f32>());
                Particle {
                    position: Vector3::new(
                        position.x + (rng.random::<f32>() - 0.5) * 0.3,
                        position.y,
                        position.z + (rng.random::<f32>() - 0.5) * 0.3,
                    ),
                    color: lerp_rgb(fire, tint, 0.3),
                    size: rng.random::<f32>() * 0.2 + 0.1,
                }
            })
            .collect();
        self.bursts.push(ParticleBurst { particles, life: 1.0 });
    }

    /// Ages every burst by `frame_scale` reference frames and drops the spent ones.
    pub fn update_particles<R: Rng>(&mut self, frame_scale: f32, rng: &mut R) {
        self.bursts.retain_mut(|burst| {
            burst.life -= PARTICLE_LIFE_DECAY * frame_scale;
            if burst.life <= 0.0 {
                return false;
            }
            let shrink = 0.98_f32.powf(frame_scale);
            for p in &mut burst.particles {
                p.position.x += (rng.random::<f32>() - 0.5) * 0.05 * frame_scale;
                p.position.y += (rng.random::<f32>() * 0.03 + 0.01) * frame_scale;
                p.position.z += (rng.random::<f32>() - 0.5) * 0.05 * frame_scale;
                p.size *= shrink;
                p.color[0] = (p.color[0] + 0.02 * frame_scale).min(1.0);
                p.color[1] = (p.color[1] + 0.01 * frame_scale).min(1.0);
                p.color[2] = (p.color[2] + 0.005 * frame_scale).min(1.0);
            }
            true
        });
    }

    pub fn update_frets(&mut self, scroll_speed: f32, frame_scale: f32) {
        for z in &mut self.fret_z {
            *z += scroll_speed * frame_scale;
            if *z > FRETBOARD_LENGTH / 2.0 {
                *z -= FRETBOARD_LENGTH;
            }
        }
    }

    pub fn set_hit_marker(&mut self, lane: Lane, pressed: bool) {
        self.marker_colors[lane.index()] = if pressed { lane.color() } else { HIT_MARKER_IDLE_COLOR };
    }

    #[allow(dead_code)]
    pub fn hit_marker_color(&self, lane: Lane) -> u32 {
        self.marker_colors[lane.index()]
    }

    pub fn clear_particles(&mut self) {
        self.bursts.clear();
    }

    pub fn bursts(&self) -> &[ParticleBurst] {
        &self.bursts
    }

    #[allow(dead_code)]
    pub fn fret_positions(&self) -> impl Iterator<Item = Vector3<f32>> + '_ {
        self.fret_z.iter().map(|&z| Vector3::new(0.0, FRET_Y, z))
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn hex_colors_unpack() {
        assert_eq!(rgb(0xff0000), [1.0, 0.0, 0.0]);
        assert_eq!(rgb(0x000000), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn bursts_spawn_fifty_particles_near_the_note() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut effects = Effects::new();
        let at = Vector3::new(1.3, 0.28, 10.0);
        effects.create_hit_effect(at, Lane::F.color(), &mut rng);
        let burst = &effects.bursts()[0];
        assert_eq!(burst.particles.len(), HIT_EFFECT_PARTICLES);
        for p in &burst.particles {
            assert!((p.position.x - at.x).abs() <= 0.15);
            assert!((p.position.z - at.z).abs() <= 0.15);
            assert!((0.1..=0.3).contains(&p.size));
        }
    }

    #[test]
    fn bursts_fade_out_after_fifty_frames() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut effects = Effects::new();
        effects.create_hit_effect(Vector3::new(0.0, 0.28, 10.0), Lane::A.color(), &mut rng);
        let y0 = effects.bursts()[0].particles[0].position.y;
        for _ in 0..10 {
            effects.update_particles(1.0, &mut rng);
        }
        let burst = &effects.bursts()[0];
        assert!((burst.opacity() - 0.8).abs() < 1e-4);
        assert!(burst.particles[0].position.y > y0);
        for _ in 0..45 {
            effects.update_particles(1.0, &mut rng);
        }
        assert!(effects.bursts().is_empty());
    }

    #[test]
    fn frets_wrap_around_the_board() {
        let mut effects = Effects::new();
        let before: Vec<f32> = effects.fret_positions().map(|p| p.z).collect();
        assert_eq!(before[0], -FRETBOARD_LENGTH / 2.0);
        assert_eq!(before[NUM_FRETS - 1], FRETBOARD_LENGTH / 2.0);

        effects.update_frets(1.0, 1.0);
        let after: Vec<f32> = effects.fret_positions().map(|p| p.z).collect();
        assert!(after.iter().all(|z| *z <= FRETBOARD_LENGTH / 2.0));
        assert!((after[NUM_FRETS - 1] - (1.0 - FRETBOARD_LENGTH / 2.0)).abs() < 1e-4);
    }

    #[test]
    fn hit_markers_light_while_pressed() {
        let mut effects = Effects::new();
        effects.set_hit_marker(Lane::S, true);
        assert_eq!(effects.hit_marker_color(Lane::S), Lane::S.color());
        effects.set_hit_marker(Lane::S, false);
        assert_eq!(effects.hit_marker_color(Lane::S), HIT_MARKER_IDLE_COLOR);
    }
}
