use pulse_core::surface::{Scene, Surface};
use pulse_core::{analyzer, animation, HostBuilder, SpectrumFeed};
use rand::{Rng, SeedableRng};

const BUCKETS: usize = 1024;
const ANALYZER_RATE: usize = 60;

/// Synthetic spectrum: a kick at 120 BPM, a slowly wandering mid band and noise
fn synthesize(buf: &mut [analyzer::SignalStrength], t: f32, rng: &mut rand::rngs::StdRng) {
    let kick = (-(t * 2.0).fract() * 8.0).exp();
    let n = buf.len() as f32;

    for (i, b) in buf.iter_mut().enumerate() {
        let f = i as f32 / n;
        let bass = if f < 0.08 { kick * 230.0 } else { 0.0 };
        let mid = (1.0 - f) * 90.0 * (0.5 + 0.5 * (t * 0.7 + f * 6.0).sin());
        let noise = rng.gen_range(0.0f32..40.0) * (1.0 - f * 0.5);

        *b = (bass + mid + noise).min(255.0);
    }
}

fn main() {
    pulse_core::default_config();
    pulse_core::default_log();

    let style: String = pulse_core::config_or!("demo.style", "blob".to_string());
    let seconds: f32 = pulse_core::config_or!("demo.seconds", 10.0);
    // Seconds per style, 0 keeps the first one
    let cycle: f32 = pulse_core::config_or!("demo.cycle", 0.0);
    let dump_svg: String = pulse_core::config_or!("demo.dump_svg", String::new());

    let start = std::time::Instant::now();

    // Analyzer {{{
    let (feed, mut tap) = SpectrumFeed::new(BUCKETS);
    let mut rng = rand::rngs::StdRng::from_entropy();
    feed.spawn(ANALYZER_RATE, move |buf| {
        synthesize(buf, pulse_core::helpers::time(start), &mut rng);
        true
    })
    .expect("Can't spawn spectrum producer");
    // }}}

    let mut host = HostBuilder::new()
        .build(Scene::new())
        .expect("Invalid host configuration");

    if let Err(e) = host.switch_to(&style) {
        log::error!("Can't start: {}", e);
        let names = animation::Style::ALL
            .iter()
            .map(|s| s.id())
            .collect::<Vec<_>>();
        log::error!("Known styles: {}", names.join(", "));
        return;
    }

    let mut beats = 0;
    let mut last_switch = 0.0;
    let mut last_report = 0.0;

    loop {
        let now = pulse_core::helpers::time(start);
        if now > seconds {
            break;
        }

        if host.tick_now(tap.latest()) {
            log::trace!("Frame: {:7}@{:.3}", host.frames(), now);

            if host.beats() > beats {
                beats = host.beats();
                println!("Beat@{:.3}: {:7.3}", now, host.bands().bass);
            }
        }

        if now - last_report >= 1.0 {
            last_report = now;
            let (a, b) = host.backdrop().colors();
            log::info!(
                "{:5.1}s {:>10}: {:5} elements, {:5} frames, backdrop {} / {}",
                now,
                host.active_style().map_or("-", |s| s.id()),
                host.surface().len(),
                host.frames(),
                a,
                b,
            );
        }

        if cycle > 0.0 && now - last_switch >= cycle {
            last_switch = now;
            if let Err(e) = host.next_style() {
                log::warn!("Can't switch style: {}", e);
            }
        }

        std::thread::sleep(std::time::Duration::from_millis(4));
    }

    if !dump_svg.is_empty() {
        let svg = host.surface().to_svg(animation::VIEW, animation::VIEW);
        match std::fs::write(&dump_svg, svg) {
            Ok(()) => log::info!("Wrote scene to {:?}", dump_svg),
            Err(e) => log::error!("Can't write {:?}: {}", dump_svg, e),
        }
    }

    let scene = host.into_surface();
    log::debug!("Shut down, {} elements left", scene.len());
}
