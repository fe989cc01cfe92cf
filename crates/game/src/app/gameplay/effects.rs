//! Particle presets.

use lattice_engine::{rgb, ColourRamp, Emission, Environment, Particles, Point3};

const SPARK_COUNT: u32 = 24;

/// Continuous spray that lands on whatever scenery is around it.
pub(crate) fn fountain(origin: Point3) -> Particles {
    let emission = Emission {
        speed: (0.02, 0.06),
        lift: (1.5, 2.5),
        gravity: -0.12,
        lifetime: (24, 40),
        ..Emission::at(origin)
    };
    let ramp = ColourRamp::new(&[rgb(3, 3, 3), rgb(1, 2, 3), rgb(0, 1, 3), rgb(0, 0, 2)]);
    Particles::new(emission, ramp)
        .with_rate(1.5)
        .with_collision_countdown(6)
}

/// One-shot burst that removes itself once the last spark has died.
pub(crate) fn sparks(origin: Point3, env: &mut Environment) -> Particles {
    let emission = Emission {
        speed: (0.05, 0.15),
        lift: (0.5, 2.0),
        gravity: -0.15,
        lifetime: (10, 20),
        ..Emission::at(origin)
    };
    let ramp = ColourRamp::new(&[rgb(3, 3, 2), rgb(3, 2, 0), rgb(3, 1, 0), rgb(2, 0, 0)]);
    Particles::new(emission, ramp)
        .with_collision_countdown(-1)
        .expiring()
        .burst(SPARK_COUNT, env)
}
