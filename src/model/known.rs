//! Read-only tables describing framework APIs the analysis understands.

/// Framework types that carry a `Dispose()` the caller is expected to invoke.
const DISPOSABLE_TYPES: &[&str] = &[
    "IDisposable",
    "IAsyncDisposable",
    "Stream",
    "FileStream",
    "MemoryStream",
    "BufferedStream",
    "NetworkStream",
    "PipeStream",
    "GZipStream",
    "DeflateStream",
    "BrotliStream",
    "CryptoStream",
    "SslStream",
    "UnmanagedMemoryStream",
    "TextReader",
    "TextWriter",
    "StreamReader",
    "StreamWriter",
    "StringReader",
    "StringWriter",
    "BinaryReader",
    "BinaryWriter",
    "XmlReader",
    "XmlWriter",
    "Process",
    "HttpClient",
    "HttpClientHandler",
    "HttpMessageHandler",
    "HttpRequestMessage",
    "HttpResponseMessage",
    "HttpContent",
    "WebClient",
    "WebResponse",
    "Socket",
    "TcpClient",
    "TcpListener",
    "UdpClient",
    "Timer",
    "CancellationTokenSource",
    "CancellationTokenRegistration",
    "SemaphoreSlim",
    "Semaphore",
    "Mutex",
    "EventWaitHandle",
    "ManualResetEvent",
    "AutoResetEvent",
    "ManualResetEventSlim",
    "CountdownEvent",
    "ReaderWriterLockSlim",
    "Barrier",
    "WaitHandle",
    "BlockingCollection",
    "DbConnection",
    "DbCommand",
    "DbDataReader",
    "DbTransaction",
    "SqlConnection",
    "SqlCommand",
    "SqlDataReader",
    "SqlTransaction",
    "IDbConnection",
    "IDbCommand",
    "IDataReader",
    "IDbTransaction",
    "RegistryKey",
    "FileSystemWatcher",
    "MemoryMappedFile",
    "SafeHandle",
    "Bitmap",
    "Image",
    "Graphics",
    "Font",
    "Brush",
    "SolidBrush",
    "Pen",
    "Icon",
    "X509Certificate2",
    "HashAlgorithm",
    "SHA1",
    "SHA256",
    "SHA512",
    "MD5",
    "HMACSHA256",
    "Aes",
    "RSA",
    "ECDsa",
    "RandomNumberGenerator",
    "ICryptoTransform",
    "IEnumerator",
    "CompositeDisposable",
    "SerialDisposable",
    "SingleAssignmentDisposable",
    "Subject",
    "BehaviorSubject",
    "ReplaySubject",
    "ServiceProvider",
    "IServiceScope",
    "ServiceScope",
    "Activity",
];

/// Types that technically implement `IDisposable` but whose disposal is not
/// required, plus primitives that never do.
const NOT_DISPOSABLE_TYPES: &[&str] = &[
    "Task",
    "ValueTask",
    "object",
    "string",
    "bool",
    "byte",
    "sbyte",
    "char",
    "short",
    "ushort",
    "int",
    "uint",
    "long",
    "ulong",
    "float",
    "double",
    "decimal",
    "nint",
    "nuint",
    "void",
    "dynamic",
    "Object",
    "String",
    "Int32",
    "Int64",
    "Boolean",
    "Guid",
    "DateTime",
    "DateTimeOffset",
    "TimeSpan",
    "List",
    "IList",
    "IEnumerable",
    "ICollection",
    "IReadOnlyList",
    "IReadOnlyCollection",
    "Dictionary",
    "IDictionary",
    "HashSet",
    "ISet",
    "Queue",
    "Stack",
    "Action",
    "Func",
    "CancellationToken",
    "StringBuilder",
    "Encoding",
];

pub(crate) fn is_disposable_type_name(name: &str) -> Option<bool> {
    if NOT_DISPOSABLE_TYPES.contains(&name) {
        return Some(false);
    }
    if DISPOSABLE_TYPES.contains(&name) {
        return Some(true);
    }
    None
}

/// Framework types used as static receivers (`File.OpenRead`, `GC.SuppressFinalize`).
const STATIC_FRAMEWORK_TYPES: &[&str] = &[
    "File",
    "Directory",
    "Path",
    "GC",
    "Task",
    "Tuple",
    "ValueTuple",
    "Console",
    "Process",
    "Enumerable",
    "Math",
    "Environment",
    "Activator",
    "Image",
    "Bitmap",
    "Encoding",
    "CancellationTokenSource",
    "WebRequest",
    "Stream",
    "TextWriter",
    "TextReader",
    "StreamReader",
    "Interlocked",
    "Volatile",
    "Debug",
    "Trace",
    "string",
    "String",
    "object",
    "Object",
    "int",
    "Guid",
    "DateTime",
    "TimeSpan",
    "Array",
    "Convert",
    "Enum",
    "Nullable",
    "Observable",
    "RandomNumberGenerator",
    "SHA256",
    "MD5",
    "Aes",
    "RSA",
];

pub(crate) fn static_framework_type(name: &str) -> Option<&'static str> {
    STATIC_FRAMEWORK_TYPES.iter().copied().find(|t| *t == name)
}

/// What a known framework call returns, and whether the caller owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KnownCall {
    pub receiver: &'static str,
    pub method: &'static str,
    pub returns: &'static str,
    pub creates: bool,
}

const fn creates(receiver: &'static str, method: &'static str, returns: &'static str) -> KnownCall {
    KnownCall {
        receiver,
        method,
        returns,
        creates: true,
    }
}

const fn shares(receiver: &'static str, method: &'static str, returns: &'static str) -> KnownCall {
    KnownCall {
        receiver,
        method,
        returns,
        creates: false,
    }
}

const KNOWN_CALLS: &[KnownCall] = &[
    creates("File", "OpenRead", "FileStream"),
    creates("File", "OpenWrite", "FileStream"),
    creates("File", "Open", "FileStream"),
    creates("File", "Create", "FileStream"),
    creates("File", "OpenText", "StreamReader"),
    creates("File", "CreateText", "StreamWriter"),
    creates("File", "AppendText", "StreamWriter"),
    creates("FileInfo", "OpenRead", "FileStream"),
    creates("FileInfo", "OpenWrite", "FileStream"),
    creates("FileInfo", "Open", "FileStream"),
    creates("FileInfo", "Create", "FileStream"),
    creates("FileInfo", "OpenText", "StreamReader"),
    creates("Process", "Start", "Process"),
    creates("Image", "FromFile", "Image"),
    creates("Image", "FromStream", "Image"),
    creates("Bitmap", "FromFile", "Image"),
    creates("CancellationTokenSource", "CreateLinkedTokenSource", "CancellationTokenSource"),
    creates("WebRequest", "GetResponse", "WebResponse"),
    creates("RandomNumberGenerator", "Create", "RandomNumberGenerator"),
    creates("SHA256", "Create", "SHA256"),
    creates("MD5", "Create", "MD5"),
    creates("Aes", "Create", "Aes"),
    creates("RSA", "Create", "RSA"),
    creates("Console", "OpenStandardInput", "Stream"),
    creates("Console", "OpenStandardOutput", "Stream"),
    creates("Console", "OpenStandardError", "Stream"),
    creates("Stream", "Synchronized", "Stream"),
    creates("TextWriter", "Synchronized", "TextWriter"),
    creates("TextReader", "Synchronized", "TextReader"),
    shares("Task", "Delay", "Task"),
    shares("Task", "Run", "Task"),
    shares("Task", "FromResult", "Task"),
    shares("Task", "WhenAll", "Task"),
    shares("Task", "WhenAny", "Task"),
    shares("File", "ReadAllText", "string"),
    shares("File", "ReadAllBytes", "byte[]"),
    shares("File", "ReadAllLines", "string[]"),
    shares("File", "Exists", "bool"),
    shares("Path", "Combine", "string"),
    shares("Path", "GetFileName", "string"),
    shares("Process", "GetCurrentProcess", "Process"),
    shares("Process", "GetProcessById", "Process"),
    shares("Encoding", "GetEncoding", "Encoding"),
];

pub(crate) fn known_call(receiver: &str, method: &str) -> Option<&'static KnownCall> {
    KNOWN_CALLS
        .iter()
        .find(|c| c.receiver == receiver && c.method == method)
}

/// Static members whose value is shared process-wide (`Console.Out`, `Stream.Null`).
const KNOWN_STATIC_MEMBERS: &[(&str, &str, &str)] = &[
    ("Console", "Out", "TextWriter"),
    ("Console", "Error", "TextWriter"),
    ("Console", "In", "TextReader"),
    ("Stream", "Null", "Stream"),
    ("TextWriter", "Null", "TextWriter"),
    ("StreamReader", "Null", "StreamReader"),
    ("Task", "CompletedTask", "Task"),
    ("string", "Empty", "string"),
    ("String", "Empty", "string"),
];

pub(crate) fn known_static_member(receiver: &str, member: &str) -> Option<&'static str> {
    KNOWN_STATIC_MEMBERS
        .iter()
        .find(|(r, m, _)| *r == receiver && *m == member)
        .map(|(_, _, t)| *t)
}

/// LINQ and collection accessors that hand out an element without creating it.
const ELEMENT_PROJECTIONS: &[&str] = &[
    "First",
    "FirstOrDefault",
    "Single",
    "SingleOrDefault",
    "Last",
    "LastOrDefault",
    "ElementAt",
    "ElementAtOrDefault",
    "Find",
    "Min",
    "Max",
    "GetValueOrDefault",
];

pub(crate) fn is_element_projection(method: &str) -> bool {
    ELEMENT_PROJECTIONS.contains(&method)
}

/// Methods that store their argument in the receiving collection.
const COLLECTION_ADDERS: &[&str] = &[
    "Add",
    "AddOrUpdate",
    "TryAdd",
    "GetOrAdd",
    "Insert",
    "Push",
    "Enqueue",
    "Post",
    "Register",
    "Attach",
];

pub(crate) fn is_collection_adder(method: &str) -> bool {
    COLLECTION_ADDERS.contains(&method)
}

const SEQUENCE_TYPES: &[&str] = &[
    "IEnumerable",
    "IList",
    "List",
    "ICollection",
    "IReadOnlyList",
    "IReadOnlyCollection",
    "ImmutableArray",
    "ImmutableList",
    "HashSet",
    "ISet",
    "Queue",
    "Stack",
    "ConcurrentBag",
    "ConcurrentQueue",
    "ObservableCollection",
    "Collection",
];

pub(crate) fn is_sequence_type(name: &str) -> bool {
    SEQUENCE_TYPES.contains(&name)
}

pub(crate) fn is_dictionary_type(name: &str) -> bool {
    matches!(
        name,
        "Dictionary" | "IDictionary" | "IReadOnlyDictionary" | "ConcurrentDictionary" | "ImmutableDictionary"
    )
}

/// Setup attribute and the teardown attribute that pairs with it.
const FIXTURE_PAIRS: &[(&str, &str)] = &[
    ("SetUp", "TearDown"),
    ("OneTimeSetUp", "OneTimeTearDown"),
    ("TestFixtureSetUp", "TestFixtureTearDown"),
    ("TestInitialize", "TestCleanup"),
    ("ClassInitialize", "ClassCleanup"),
    ("GlobalSetup", "GlobalCleanup"),
    ("IterationSetup", "IterationCleanup"),
];

pub(crate) fn teardown_for(setup_attribute: &str) -> Option<&'static str> {
    FIXTURE_PAIRS
        .iter()
        .find(|(setup, _)| *setup == setup_attribute)
        .map(|(_, teardown)| *teardown)
}

pub(crate) const GENERATED_CODE_ATTRIBUTES: &[&str] = &["GeneratedCode", "CompilerGenerated"];
