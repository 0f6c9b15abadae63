mod dispatch;
mod gift_certificates;
mod helpers;
mod mail_settings;
mod tracker;
