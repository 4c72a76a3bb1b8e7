//! The refresh loop: fetch both providers, build a snapshot, render it and show it.
//!
//! A cycle that fails anywhere is abandoned and the panel keeps its previous frame. The loop
//! itself never stops.

use std::marker::PhantomData;
use std::time::Duration;

use time::OffsetDateTime;

use crate::display::Display;
use crate::error::CycleError;
use crate::image::{self, IconLibrary, Ink, PietSurface, Surface};
use crate::normalize;
use crate::weather::{CurrentConditionsProvider, ForecastProvider};

/// Time between the end of one cycle and the start of the next.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
    Fetched,
    PartialFailure,
    Rendering,
    Displayed,
    Sleeping,
}

pub struct Poller<C, F, D, S = PietSurface> {
    current: C,
    forecast: F,
    display: D,
    icons: IconLibrary,
    font_family: String,
    state: PollState,
    clock: fn() -> OffsetDateTime,
    surface: PhantomData<fn() -> S>,
}

impl<C, F, D> Poller<C, F, D, PietSurface>
where
    C: CurrentConditionsProvider,
    F: ForecastProvider,
    D: Display,
{
    pub fn new(current: C, forecast: F, display: D, icons: IconLibrary, font_family: &str) -> Self {
        Self {
            current,
            forecast,
            display,
            icons,
            font_family: font_family.to_string(),
            state: PollState::Idle,
            clock: OffsetDateTime::now_utc,
            surface: PhantomData,
        }
    }
}

impl<C, F, D, S> Poller<C, F, D, S>
where
    C: CurrentConditionsProvider,
    F: ForecastProvider,
    D: Display,
    S: Surface,
{
    /// Draw with a different surface implementation.
    pub fn with_surface<T: Surface>(self) -> Poller<C, F, D, T> {
        Poller {
            current: self.current,
            forecast: self.forecast,
            display: self.display,
            icons: self.icons,
            font_family: self.font_family,
            state: self.state,
            clock: self.clock,
            surface: PhantomData,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> OffsetDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn display(&self) -> &D {
        &self.display
    }

    /// Run forever.
    pub async fn run(&mut self) {
        loop {
            self.tick().await;
        }
    }

    /// One cycle followed by the fixed sleep. Returns how the cycle ended.
    pub async fn tick(&mut self) -> PollState {
        let outcome = self.run_cycle().await;

        self.transition(PollState::Sleeping);
        log::info!("Next refresh in {}s", REFRESH_INTERVAL.as_secs());
        tokio::time::sleep(REFRESH_INTERVAL).await;
        self.transition(PollState::Idle);

        outcome
    }

    /// Fetch, render and display once. Ends in [`PollState::Displayed`] or
    /// [`PollState::PartialFailure`]; failures are logged here and go no further.
    pub async fn run_cycle(&mut self) -> PollState {
        self.transition(PollState::Fetching);

        match self.refresh().await {
            Ok(()) => log::info!("Display updated"),
            Err(e) => {
                log::error!("Skipping this cycle: {}", e);
                self.transition(PollState::PartialFailure);
            }
        }

        self.state
    }

    async fn refresh(&mut self) -> Result<(), CycleError> {
        let (current, forecast) = tokio::join!(
            self.current.fetch_current(),
            self.forecast.fetch_forecast()
        );

        let (current, forecast) = match (current, forecast) {
            (Ok(current), Ok(forecast)) => (current, forecast),
            (Err(current), Err(forecast)) => return Err(CycleError::Providers(current, forecast)),
            (Err(e), _) => return Err(CycleError::Current(e)),
            (_, Err(e)) => return Err(CycleError::Forecast(e)),
        };

        let snapshot = normalize::build_snapshot(&current, &forecast, (self.clock)())?;
        self.transition(PollState::Fetched);

        self.transition(PollState::Rendering);
        let bitmap = image::render::<S>(&snapshot, &self.icons, &self.font_family)?;

        self.display.set_border(Ink::Black);
        self.display
            .set_image(&bitmap)
            .and_then(|_| self.display.show())
            .map_err(|e| CycleError::Display(e.to_string()))?;
        self.transition(PollState::Displayed);

        Ok(())
    }

    fn transition(&mut self, next: PollState) {
        log::debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::image::surface::RecordingSurface;
    use crate::image::{icons, Bitmap};
    use crate::normalize::IconCategory;
    use crate::test_log;
    use crate::weather::{RawCurrentReading, RawForecastPeriod};
    use std::cell::Cell;
    use time::macros::datetime;

    fn now() -> OffsetDateTime {
        datetime!(2024-05-01 17:30 UTC)
    }

    fn reading() -> RawCurrentReading {
        RawCurrentReading {
            temperature: 66.2,
            condition: "02d".to_string(),
            status: 200,
        }
    }

    fn periods(count: usize) -> Vec<RawForecastPeriod> {
        [
            (datetime!(2024-05-01 14:00 -4), true, 71, "sct"),
            (datetime!(2024-05-01 18:00 -4), false, 50, "rain_showers,30"),
            (datetime!(2024-05-02 06:00 -4), true, 68, "tsra,40"),
            (datetime!(2024-05-02 18:00 -4), false, 47, "few"),
        ]
        .iter()
        .take(count)
        .map(|(start_time, is_daytime, temperature, icon)| RawForecastPeriod {
            name: "Period".to_string(),
            start_time: *start_time,
            temperature: *temperature,
            is_daytime: *is_daytime,
            icon: format!("https://api.weather.gov/icons/land/day/{}?size=medium", icon),
        })
        .collect()
    }

    fn library() -> IconLibrary {
        let mut library = IconLibrary::new();
        for category in IconCategory::ALL.iter() {
            library
                .insert(*category, icons::SQUARE_SVG.as_bytes())
                .unwrap();
        }
        library
    }

    struct FakeCurrent {
        result: Result<RawCurrentReading, FetchError>,
        calls: Cell<usize>,
    }

    impl FakeCurrent {
        fn new(result: Result<RawCurrentReading, FetchError>) -> Self {
            Self {
                result,
                calls: Cell::new(0),
            }
        }
    }

    impl CurrentConditionsProvider for FakeCurrent {
        async fn fetch_current(&self) -> Result<RawCurrentReading, FetchError> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone()
        }
    }

    struct FakeForecast(Result<Vec<RawForecastPeriod>, FetchError>);

    impl ForecastProvider for FakeForecast {
        async fn fetch_forecast(&self) -> Result<Vec<RawForecastPeriod>, FetchError> {
            self.0.clone()
        }
    }

    #[derive(Debug, PartialEq)]
    enum Call {
        Border(Ink),
        Image(Bitmap),
        Show,
    }

    #[derive(Default)]
    struct FakeDisplay {
        calls: Vec<Call>,
        fail_show: bool,
    }

    impl Display for FakeDisplay {
        type Err = String;

        fn set_border(&mut self, border: Ink) {
            self.calls.push(Call::Border(border));
        }

        fn set_image(&mut self, image: &Bitmap) -> Result<(), Self::Err> {
            self.calls.push(Call::Image(image.clone()));
            Ok(())
        }

        fn show(&mut self) -> Result<(), Self::Err> {
            if self.fail_show {
                return Err("SPI write failed".to_string());
            }
            self.calls.push(Call::Show);
            Ok(())
        }

        fn dimensions(&self) -> (usize, usize) {
            (400, 300)
        }
    }

    fn poller(
        current: Result<RawCurrentReading, FetchError>,
        forecast: Result<Vec<RawForecastPeriod>, FetchError>,
    ) -> Poller<FakeCurrent, FakeForecast, FakeDisplay, RecordingSurface> {
        Poller::new(
            FakeCurrent::new(current),
            FakeForecast(forecast),
            FakeDisplay::default(),
            library(),
            "serif",
        )
        .with_surface::<RecordingSurface>()
        .with_clock(now)
    }

    #[tokio::test]
    async fn successful_cycle_shows_the_rendered_snapshot() {
        let mut poller = poller(Ok(reading()), Ok(periods(4)));

        assert_eq!(PollState::Displayed, poller.run_cycle().await);

        let snapshot = normalize::build_snapshot(&reading(), &periods(4), now()).unwrap();
        let expected = image::render::<RecordingSurface>(&snapshot, &library(), "serif").unwrap();

        assert_eq!(
            vec![Call::Border(Ink::Black), Call::Image(expected), Call::Show],
            poller.display().calls
        );
    }

    #[tokio::test]
    async fn current_conditions_failure_skips_display() {
        test_log::capture();
        let mut poller = poller(
            Err(FetchError::status(401, "Invalid API key")),
            Ok(periods(3)),
        );

        assert_eq!(PollState::PartialFailure, poller.run_cycle().await);
        assert!(poller.display().calls.is_empty());

        let errors = test_log::errors();
        assert_eq!(1, errors.len());
        assert!(errors[0].contains("401"), "{}", errors[0]);
    }

    #[tokio::test]
    async fn forecast_failure_skips_display() {
        test_log::capture();
        let mut poller = poller(
            Ok(reading()),
            Err(FetchError::transport("operation timed out")),
        );

        assert_eq!(PollState::PartialFailure, poller.run_cycle().await);
        assert!(poller.display().calls.is_empty());
        assert_eq!(1, test_log::errors().len());
    }

    #[tokio::test]
    async fn both_failures_are_one_event() {
        test_log::capture();
        let mut poller = poller(
            Err(FetchError::status(500, "")),
            Err(FetchError::status(503, "")),
        );

        assert_eq!(PollState::PartialFailure, poller.run_cycle().await);

        let errors = test_log::errors();
        assert_eq!(1, errors.len());
        assert!(errors[0].contains("500") && errors[0].contains("503"));
    }

    #[tokio::test]
    async fn short_forecast_skips_display() {
        test_log::capture();
        let mut poller = poller(Ok(reading()), Ok(periods(2)));

        assert_eq!(PollState::PartialFailure, poller.run_cycle().await);
        assert!(poller.display().calls.is_empty());
        assert_eq!(1, test_log::errors().len());
    }

    #[tokio::test]
    async fn display_failure_ends_the_cycle() {
        let mut poller = poller(Ok(reading()), Ok(periods(3)));
        poller.display.fail_show = true;

        assert_eq!(PollState::PartialFailure, poller.run_cycle().await);
        assert!(!poller.display().calls.contains(&Call::Show));
    }

    #[tokio::test(start_paused = true)]
    async fn tick_sleeps_the_fixed_interval() {
        let mut poller = poller(Err(FetchError::status(500, "")), Ok(periods(3)));
        let started = tokio::time::Instant::now();

        assert_eq!(PollState::PartialFailure, poller.tick().await);
        assert_eq!(PollState::Idle, poller.state());
        assert_eq!(REFRESH_INTERVAL, started.elapsed());

        // A failed cycle doesn't stop the next one.
        poller.tick().await;
        assert_eq!(2, poller.current.calls.get());
        assert_eq!(REFRESH_INTERVAL * 2, started.elapsed());
    }
}
