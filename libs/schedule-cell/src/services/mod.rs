pub mod exceptions;
pub mod slots;
pub mod template;

pub use exceptions::ExceptionService;
pub use slots::SlotGeneratorService;
pub use template::ScheduleTemplateService;
