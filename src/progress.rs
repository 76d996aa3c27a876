//! Модуль для отслеживания прогресса выполнения операций
//!
//! Этот модуль предоставляет реализацию паттерна Observer для
//! отслеживания прогресса озвучивания сценария.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};

/// Информация о прогрессе выполнения операции
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Текущий этап операции
    pub step: String,
    /// Процент выполнения текущего этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Общий процент выполнения всей операции (0.0 - 100.0)
    pub total_progress: f32,
    /// Дополнительная информация о текущем этапе
    pub details: Option<String>,
}

impl ProgressInfo {
    pub fn new(step: impl Into<String>, step_progress: f32, total_progress: f32, details: Option<String>) -> Self {
        Self {
            step: step.into(),
            step_progress: step_progress.clamp(0.0, 100.0),
            total_progress: total_progress.clamp(0.0, 100.0),
            details,
        }
    }
}

/// Трейт для наблюдателя, получающего уведомления о прогрессе
pub trait ProgressObserver: Send + Sync {
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Трейт для объекта, рассылающего уведомления о прогрессе
pub trait ProgressReporter: Send + Sync {
    /// Добавить наблюдателя
    ///
    /// Возвращает идентификатор, по которому наблюдателя можно удалить.
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize;

    /// Удалить наблюдателя по идентификатору
    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>>;

    /// Уведомить всех наблюдателей о прогрессе
    fn notify_progress(&self, progress: ProgressInfo);
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Реализация ProgressReporter по умолчанию
pub struct DefaultProgressReporter {
    observers: RwLock<HashMap<usize, Box<dyn ProgressObserver>>>,
    next_id: AtomicUsize,
}

impl DefaultProgressReporter {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Количество подключенных наблюдателей
    pub fn observer_count(&self) -> usize {
        read(&self.observers).len()
    }
}

impl Default for DefaultProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for DefaultProgressReporter {
    fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        write(&self.observers).insert(id, observer);
        id
    }

    fn remove_observer(&mut self, id: usize) -> Option<Box<dyn ProgressObserver>> {
        write(&self.observers).remove(&id)
    }

    fn notify_progress(&self, progress: ProgressInfo) {
        let observers = read(&self.observers);
        for observer in observers.values() {
            observer.on_progress_update(progress.clone());
        }
    }
}

/// Этапы озвучивания сценария
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStep {
    /// Разбор сценария на предложения
    ScriptParsing,
    /// Объединение соседних реплик
    SegmentMerging,
    /// Синтез речи
    SpeechSynthesis,
    /// Сборка итоговой дорожки
    AudioAssembly,
}

impl ProcessStep {
    /// Получить название этапа в виде строки
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScriptParsing => "Разбор сценария",
            Self::SegmentMerging => "Объединение реплик",
            Self::SpeechSynthesis => "Синтез речи",
            Self::AudioAssembly => "Сборка аудиодорожки",
        }
    }

    /// Вес этапа в процентах от всего процесса
    pub fn weight(&self) -> f32 {
        match self {
            Self::ScriptParsing => 5.0,
            Self::SegmentMerging => 5.0,
            Self::SpeechSynthesis => 80.0,
            Self::AudioAssembly => 10.0,
        }
    }
}

/// Трекер прогресса для отслеживания выполнения процесса
pub struct ProgressTracker {
    reporter: Option<Box<dyn ProgressReporter>>,
    current_step: RwLock<ProcessStep>,
    /// Прогресс текущего этапа (0.0 - 100.0)
    step_progress: RwLock<f32>,
    /// Общий прогресс (0.0 - 100.0)
    total_progress: RwLock<f32>,
    completed_steps: RwLock<HashMap<ProcessStep, f32>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            reporter: None,
            current_step: RwLock::new(ProcessStep::ScriptParsing),
            step_progress: RwLock::new(0.0),
            total_progress: RwLock::new(0.0),
            completed_steps: RwLock::new(HashMap::new()),
        }
    }

    /// Создать трекер с репортером
    pub fn with_reporter(reporter: Box<dyn ProgressReporter>) -> Self {
        let mut tracker = Self::new();
        tracker.reporter = Some(reporter);
        tracker
    }

    pub fn set_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        self.reporter = Some(reporter);
    }

    /// Добавить наблюдателя; `None`, если репортер не установлен
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> Option<usize> {
        self.reporter.as_mut().map(|reporter| reporter.add_observer(observer))
    }

    pub fn current_step(&self) -> ProcessStep {
        *read(&self.current_step)
    }

    pub fn total_progress(&self) -> f32 {
        *read(&self.total_progress)
    }

    /// Установить текущий этап
    ///
    /// Предыдущий этап считается завершенным на 100%.
    pub fn set_step(&self, step: ProcessStep) {
        {
            let mut current_step = write(&self.current_step);
            if *current_step == step {
                return;
            }
            write(&self.completed_steps).insert(*current_step, 100.0);
            *current_step = step;
        }
        *write(&self.step_progress) = 0.0;

        self.update_total_progress();
        self.report_progress(None);
    }

    /// Обновить прогресс текущего этапа
    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        *write(&self.step_progress) = progress.clamp(0.0, 100.0);
        self.update_total_progress();
        self.report_progress(details);
    }

    fn update_total_progress(&self) {
        let mut total = 0.0;
        let mut total_weight = 0.0;

        let current_step = *read(&self.current_step);
        for (step, progress) in read(&self.completed_steps).iter() {
            if *step == current_step {
                continue;
            }
            total += step.weight() * progress / 100.0;
            total_weight += step.weight();
        }

        total += current_step.weight() * *read(&self.step_progress) / 100.0;
        total_weight += current_step.weight();

        // доля от всех этапов, а не только пройденных
        let all_weight: f32 = [
            ProcessStep::ScriptParsing,
            ProcessStep::SegmentMerging,
            ProcessStep::SpeechSynthesis,
            ProcessStep::AudioAssembly,
        ]
        .iter()
        .map(ProcessStep::weight)
        .sum();
        let denominator = if total_weight > all_weight { total_weight } else { all_weight };

        *write(&self.total_progress) = (total / denominator * 100.0).clamp(0.0, 100.0);
    }

    fn report_progress(&self, details: Option<String>) {
        if let Some(reporter) = &self.reporter {
            let progress = ProgressInfo::new(
                self.current_step().as_str(),
                *read(&self.step_progress),
                self.total_progress(),
                details,
            );
            reporter.notify_progress(progress);
        }
    }

    /// Сбросить состояние перед новым запуском; наблюдатели не уведомляются
    pub fn reset(&self) {
        *write(&self.current_step) = ProcessStep::ScriptParsing;
        write(&self.completed_steps).clear();
        *write(&self.step_progress) = 0.0;
        *write(&self.total_progress) = 0.0;
    }

    /// Отметить завершение всего процесса
    pub fn complete(&self) {
        let current_step = self.current_step();
        write(&self.completed_steps).insert(current_step, 100.0);
        *write(&self.step_progress) = 100.0;
        *write(&self.total_progress) = 100.0;

        self.report_progress(Some("Процесс завершен".to_string()));
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
