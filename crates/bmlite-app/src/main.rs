#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use bmlite_hal::PhyLink;
use bmlite_hal::TransportConfig;
use bmlite_nrf::{transport, NrfPlatform, NrfTransport, BMLITE_PINS};
use embassy_executor::Spawner;
use embassy_time::Timer;

#[cfg(feature = "defmt")]
use defmt_rtt as _;
#[cfg(feature = "defmt")]
use panic_probe as _;
#[cfg(not(feature = "defmt"))]
use panic_reset as _;

#[cfg_attr(not(feature = "defmt"), allow(dead_code))]
const FW_VERSION: &str = env!("FW_VERSION");

/// Bytes read each time the sensor signals it has data.
const FRAME_HEADER_LEN: usize = 4;

/// Bring the sensor up, retrying until the bus and pins can be acquired.
async fn bring_up(sensor: &mut NrfTransport, config: &TransportConfig) {
    loop {
        match sensor.init_async(config, Some(&BMLITE_PINS)).await {
            Ok(()) => return,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("BM-Lite init failed: {}", _e);
                sensor.timebase().sleep_async(1000).await;
            }
        }
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    #[cfg(feature = "defmt")]
    defmt::info!("bmlite-app {}", FW_VERSION);

    let p = embassy_nrf::init(Default::default());

    // SAFETY: the Arduino header pins in BMLITE_PINS are wired to the sensor
    // shield and nothing else in this firmware touches them.
    let platform = unsafe { NrfPlatform::new(p.SPI2, p.SPI3) };
    let mut sensor = transport(platform);
    let config = TransportConfig::default();

    bring_up(&mut sensor, &config).await;

    #[cfg(feature = "defmt")]
    if let Ok(link) = sensor.link() {
        defmt::info!("BM-Lite up, rx timeout {} ms", link.rx_timeout());
    }

    loop {
        let ready = match sensor.session() {
            Ok(session) => session.read_status(),
            Err(_) => false,
        };

        if ready {
            let mut header = [0u8; FRAME_HEADER_LEN];
            let result = match sensor.link() {
                Ok(mut link) => {
                    link.read_async(&mut header, config.timeout_ms).await
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    #[cfg(feature = "defmt")]
                    defmt::info!("Frame header: {:02x}", header);
                }
                Err(_e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Read failed: {}, restarting transport", _e);
                    if let Err(_e) = sensor.deinit_async(None).await {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("Teardown incomplete: {}", _e);
                    }
                    bring_up(&mut sensor, &config).await;
                }
            }
        }

        Timer::after_millis(50).await;
    }
}
