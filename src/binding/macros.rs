//! The `record!` macro.

/// Declare a record struct together with its binding table.
///
/// Each field may carry a rule string after `=>` (see [`FieldRule`]);
/// a field without one reads the column named after the field. The
/// struct must implement `Default`.
///
/// The macro implements [`Record`], [`FromRow`] and [`FromValue`], so the
/// type can be read from a sheet and nested inside other records.
///
/// ```
/// sheetbind::record! {
///     #[derive(Debug, Default)]
///     pub struct Temp {
///         pub foo: String => "column(Foo)",
///     }
/// }
///
/// sheetbind::record! {
///     #[derive(Debug, Default)]
///     pub struct Advance {
///         pub id: i64 => "column(ID)",
///         pub name: String => "column(NameOf);nil(Ben);req();",
///         pub age: i32 => "column(AgeOf);default(180);req();",
///         pub slice: Vec<i32> => "column(Slice);split(|);req();",
///         pub temp: Option<Temp> => r#"column(UnmarshalString);default({"Foo":"Default"});req();"#,
///         pub ignored: String => "-",
///         pub not_required: String,
///     }
/// }
/// ```
///
/// [`FieldRule`]: crate::binding::FieldRule
/// [`Record`]: crate::binding::Record
/// [`FromRow`]: crate::binding::FromRow
/// [`FromValue`]: crate::binding::FromValue
#[macro_export]
macro_rules! record {
    (@tag) => { "" };
    (@tag $tag:literal) => { $tag };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $field_ty:ty $(=> $tag:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $field_ty,
            )*
        }

        impl $crate::binding::Record for $name {
            fn schema() -> ::std::result::Result<
                &'static $crate::binding::Schema<Self>,
                $crate::binding::RuleError,
            > {
                static SCHEMA: ::std::sync::OnceLock<
                    ::std::result::Result<
                        $crate::binding::Schema<$name>,
                        $crate::binding::RuleError,
                    >,
                > = ::std::sync::OnceLock::new();

                SCHEMA
                    .get_or_init(|| {
                        $crate::binding::Schema::<$name>::builder()
                            $(
                                .field(
                                    stringify!($field),
                                    $crate::record!(@tag $($tag)?),
                                    |record| &mut record.$field,
                                )
                            )*
                            .build()
                    })
                    .as_ref()
                    .map_err(::std::clone::Clone::clone)
            }
        }

        impl $crate::binding::FromRow for $name {
            fn from_row(
                row: &$crate::xlsx::Row,
                titles: &$crate::xlsx::Titles,
            ) -> $crate::Result<Self> {
                $crate::binding::bind_row(row, titles)
            }
        }

        impl $crate::binding::FromValue for $name {
            fn from_value(value: &$crate::binding::Value) -> $crate::Result<Self> {
                $crate::binding::bind_value(value)
            }
        }
    };
}
